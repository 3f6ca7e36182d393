//! Error types for the PGXL testkit.
//!
//! All fallible operations across the driver crates return [`Result<T>`],
//! which uses [`Error`] as the error type. Connection, framing, transaction
//! and input-validation failures are all captured here.

use std::time::Duration;

/// The error type for all device-link operations.
///
/// Variants cover the failure modes of a counted line-protocol session:
/// sockets that never open or drop mid-session, replies that never arrive,
/// replies that arrive malformed or out of step, and caller input that is
/// rejected before anything reaches the wire.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The socket could not be opened (refused, unreachable, bad address).
    #[error("connection error: {0}")]
    Connection(String),

    /// The TCP connect did not complete within the connect timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// An operation was attempted while the session is not connected.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the connection or a write failed mid-session.
    #[error("connection lost")]
    ConnectionLost,

    /// No reply with the pending sequence number arrived before the deadline.
    #[error("timeout waiting for reply to C{seq}|{body}")]
    Timeout {
        /// Sequence number of the unanswered command.
        seq: u32,
        /// Command body that was sent.
        body: String,
    },

    /// A single transport read saw no data before its timeout.
    ///
    /// The line framer absorbs this; it only escapes from raw transport use.
    #[error("timeout waiting for data")]
    ReadTimeout,

    /// A reply line is missing its required `R<seq>|<status>|` structure.
    #[error("malformed reply: {0:?}")]
    MalformedReply(String),

    /// A reply carried a sequence number other than the one just sent.
    #[error("sequence mismatch: sent {expected}, got {got}")]
    SequenceMismatch {
        /// Sequence number of the pending command.
        expected: u32,
        /// Sequence number echoed by the device.
        got: u32,
    },

    /// The band has no entry in the active band plan.
    #[error("unsupported band: {0} m")]
    UnsupportedBand(u16),

    /// An invalid parameter was passed to a device command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The device answered with a non-zero status code.
    #[error("command {body:?} rejected with status {status}")]
    Rejected {
        /// Raw status token from the reply.
        status: String,
        /// Command body that was rejected.
        body: String,
    },

    /// A protocol-level error not covered by a more specific variant.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for errors that mean the session has no usable socket.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::Connection(_)
                | Error::ConnectTimeout(_)
                | Error::NotConnected
                | Error::ConnectionLost
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_connection() {
        let e = Error::Connection("connection refused: 10.0.0.5:9008".into());
        assert_eq!(
            e.to_string(),
            "connection error: connection refused: 10.0.0.5:9008"
        );
    }

    #[test]
    fn error_display_timeout_names_seq_and_body() {
        let e = Error::Timeout {
            seq: 7,
            body: "status".into(),
        };
        assert_eq!(e.to_string(), "timeout waiting for reply to C7|status");
    }

    #[test]
    fn error_display_malformed_reply() {
        let e = Error::MalformedReply("R3|0".into());
        assert_eq!(e.to_string(), "malformed reply: \"R3|0\"");
    }

    #[test]
    fn error_display_sequence_mismatch() {
        let e = Error::SequenceMismatch {
            expected: 4,
            got: 3,
        };
        assert_eq!(e.to_string(), "sequence mismatch: sent 4, got 3");
    }

    #[test]
    fn error_display_unsupported_band() {
        assert_eq!(Error::UnsupportedBand(2).to_string(), "unsupported band: 2 m");
    }

    #[test]
    fn error_display_rejected() {
        let e = Error::Rejected {
            status: "50000015".into(),
            body: "slice s 0 mode=FOO".into(),
        };
        assert_eq!(
            e.to_string(),
            "command \"slice s 0 mode=FOO\" rejected with status 50000015"
        );
    }

    #[test]
    fn error_display_not_connected() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn connection_class() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::ConnectionLost.is_connection_error());
        assert!(Error::ConnectTimeout(Duration::from_secs(5)).is_connection_error());
        assert!(Error::Connection("refused".into()).is_connection_error());
        assert!(!Error::UnsupportedBand(2).is_connection_error());
        assert!(
            !Error::Timeout {
                seq: 1,
                body: "status".into()
            }
            .is_connection_error()
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
