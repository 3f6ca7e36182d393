//! Counted command/reply transactions over one session.
//!
//! [`LineLink`] owns the transport exclusively. Each transaction assigns the
//! next sequence number, writes `C<seq>|<body>`, and (when a reply is
//! expected) reads lines until `R<seq>|` arrives or the deadline passes.
//! Lines that are not the awaited reply feed the cached-state scanner.
//!
//! Transactions are strictly serialized: every method takes `&mut self`, so
//! at most one command is outstanding and replies can never be misattributed.

use std::time::Duration;

use tokio::time::Instant;

use pgxl_core::error::{Error, Result};
use pgxl_core::transport::Transport;

use crate::framer::LineFramer;
use crate::protocol::{parse_reply, LineKind, Reply, StrayReplyPolicy};
use crate::session::{LinkConfig, SessionState};
use crate::state::CachedState;

/// Longest single read while waiting for a reply or draining.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// LineLink
// ---------------------------------------------------------------------------

/// A counted line-protocol session with one device.
pub struct LineLink {
    pub(crate) config: LinkConfig,
    pub(crate) transport: Option<Box<dyn Transport>>,
    pub(crate) framer: LineFramer,
    pub(crate) seq: u32,
    pub(crate) state: SessionState,
    pub(crate) cache: CachedState,
    pub(crate) banner: Option<String>,
}

impl LineLink {
    /// Create a disconnected link.
    pub fn new(config: LinkConfig) -> Self {
        let cache = CachedState::new(config.watched_fields.iter().cloned());
        LineLink {
            config,
            transport: None,
            framer: LineFramer::new(),
            seq: 0,
            state: SessionState::Disconnected,
            cache,
            banner: None,
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Mutable session configuration; changes apply from the next connect.
    pub fn config_mut(&mut self) -> &mut LinkConfig {
        &mut self.config
    }

    /// Values scanned from unsolicited lines during this session.
    pub fn cached(&self) -> &CachedState {
        &self.cache
    }

    /// Mutable access to the scanner, e.g. to watch another field.
    pub fn cached_mut(&mut self) -> &mut CachedState {
        &mut self.cache
    }

    /// Sequence number of the most recently sent command (0 before any).
    pub fn last_seq(&self) -> u32 {
        self.seq
    }

    /// Send one command.
    ///
    /// With `expect_reply` the call waits up to `timeout` for the matching
    /// reply and returns it; otherwise it returns `None` as soon as the frame
    /// is written. A reply's status is not interpreted here.
    ///
    /// A write or read failure, a peer close, or (for a strict dialect) a
    /// reply for another sequence number tears the session down. A timeout
    /// leaves the session usable.
    pub async fn send(
        &mut self,
        body: &str,
        expect_reply: bool,
        timeout: Duration,
    ) -> Result<Option<Reply>> {
        if !matches!(self.state, SessionState::Priming | SessionState::Ready) {
            return Err(Error::NotConnected);
        }
        if self.transport.is_none() {
            return Err(Error::NotConnected);
        }
        let Some(seq) = self.seq.checked_add(1) else {
            tracing::warn!(
                dialect = self.config.dialect.name,
                "sequence counter exhausted; closing session"
            );
            self.disconnect().await;
            return Err(Error::Protocol("sequence counter exhausted".into()));
        };
        self.seq = seq;
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        let frame = self.config.dialect.encode(seq, body);
        tracing::debug!(dialect = self.config.dialect.name, seq, body, "send");

        if let Err(e) = transport.send(&frame).await {
            if e.is_connection_error() || matches!(e, Error::Io(_)) {
                tracing::warn!(seq, body, error = %e, "write failed; closing session");
                self.disconnect().await;
                return Err(Error::ConnectionLost);
            }
            return Err(e);
        }

        if !expect_reply {
            return Ok(None);
        }
        self.await_reply(seq, body, timeout).await.map(Some)
    }

    async fn await_reply(&mut self, seq: u32, body: &str, timeout: Duration) -> Result<Reply> {
        let marker = self.config.dialect.reply_marker(seq);
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(line) = self.framer.next_line() {
                if line.starts_with(&marker) {
                    let reply = parse_reply(&line, self.config.dialect.reply_prefix, seq)?;
                    tracing::debug!(seq, status = %reply.status, "reply");
                    return Ok(reply);
                }
                if let Err(e) = self.route_unmatched(seq, &line) {
                    self.disconnect().await;
                    return Err(e);
                }
            }

            if self.framer.is_peer_closed() {
                tracing::warn!(seq, body, "peer closed while awaiting reply");
                self.disconnect().await;
                return Err(Error::ConnectionLost);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(seq, body, ?timeout, "no reply before deadline");
                return Err(Error::Timeout {
                    seq,
                    body: body.to_string(),
                });
            }

            self.read_more((deadline - now).min(POLL_INTERVAL)).await?;
        }
    }

    /// One bounded read into the framer. A transport failure closes the
    /// session.
    async fn read_more(&mut self, wait: Duration) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        let result = self.framer.fill(transport.as_mut(), wait).await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_connection_error() || matches!(e, Error::Io(_)) => {
                tracing::warn!(
                    dialect = self.config.dialect.name,
                    error = %e,
                    "read failed; closing session"
                );
                self.disconnect().await;
                Err(Error::ConnectionLost)
            }
            Err(e) => Err(e),
        }
    }

    fn route_unmatched(&mut self, pending: u32, line: &str) -> Result<()> {
        if let LineKind::Reply { seq } = self.config.dialect.classify(line) {
            match self.config.dialect.stray_replies {
                StrayReplyPolicy::Reject => {
                    tracing::warn!(expected = pending, got = seq, line, "reply out of sequence; closing session");
                    return Err(Error::SequenceMismatch {
                        expected: pending,
                        got: seq,
                    });
                }
                StrayReplyPolicy::Tolerate => {
                    tracing::debug!(expected = pending, got = seq, "ignoring stray reply");
                }
            }
        } else {
            tracing::trace!(line, "unsolicited");
        }
        self.cache.scan(line);
        Ok(())
    }

    /// Send and wait with the configured command timeout; a non-zero status
    /// becomes [`Error::Rejected`].
    pub async fn send_command(&mut self, body: &str) -> Result<Reply> {
        self.send_command_with_timeout(body, self.config.command_timeout)
            .await
    }

    /// [`send_command`](Self::send_command) with an explicit deadline.
    pub async fn send_command_with_timeout(
        &mut self,
        body: &str,
        timeout: Duration,
    ) -> Result<Reply> {
        let reply = self
            .send(body, true, timeout)
            .await?
            .ok_or(Error::NotConnected)?;
        if !reply.is_success() {
            return Err(Error::Rejected {
                status: reply.status,
                body: body.to_string(),
            });
        }
        Ok(reply)
    }

    /// Write a command without waiting for its reply.
    pub async fn send_command_no_wait(&mut self, body: &str) -> Result<()> {
        self.send(body, false, self.config.command_timeout)
            .await
            .map(|_| ())
    }

    /// Send a command whose failure must not abort the caller.
    ///
    /// Errors and non-zero statuses are logged and swallowed. Returns whether
    /// the command went through cleanly.
    pub async fn send_best_effort(&mut self, body: &str, expect_reply: bool) -> bool {
        match self
            .send(body, expect_reply, self.config.command_timeout)
            .await
        {
            Ok(Some(reply)) if !reply.is_success() => {
                tracing::warn!(body, status = %reply.status, "best-effort command rejected");
                false
            }
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(body, error = %e, "best-effort command failed");
                false
            }
        }
    }

    /// Read and absorb whatever arrives within `window`.
    ///
    /// Every line goes through the cached-state scanner. Returns the number
    /// of lines absorbed. A peer close tears the session down.
    pub async fn drain(&mut self, window: Duration) -> Result<usize> {
        if self.transport.is_none() {
            return Err(Error::NotConnected);
        }
        let deadline = Instant::now() + window;
        let mut absorbed = 0;
        loop {
            while let Some(line) = self.framer.next_line() {
                self.cache.scan(&line);
                absorbed += 1;
            }
            if self.framer.is_peer_closed() {
                self.disconnect().await;
                return Err(Error::ConnectionLost);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(absorbed);
            }
            self.read_more((deadline - now).min(POLL_INTERVAL)).await?;
        }
    }
}

impl std::fmt::Debug for LineLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineLink")
            .field("dialect", &self.config.dialect.name)
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state)
            .field("seq", &self.seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Dialect;
    use pgxl_test_harness::ScriptedTransport;

    async fn ready_link(dialect: Dialect, script: &ScriptedTransport) -> LineLink {
        let mut config = LinkConfig::new(dialect);
        config.command_timeout = Duration::from_secs(1);
        config.watched_fields = vec!["band_persistence_enabled".into()];
        let mut link = LineLink::new(config);
        link.connect_with_transport(Box::new(script.clone()))
            .await
            .unwrap();
        link
    }

    // -- Sequencing -----------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn sequence_numbers_count_from_one() {
        let script = ScriptedTransport::new();
        script.reply_to("status", "0|vdd=48.1");
        let mut link = ready_link(Dialect::pgxl(), &script).await;

        for expected in 1..=3 {
            let reply = link.send_command("status").await.unwrap();
            assert_eq!(reply.seq, expected);
        }
        link.send_command_no_wait("operate=1").await.unwrap();

        assert_eq!(script.sent_sequences(), vec![1, 2, 3, 4]);
        assert_eq!(script.sent_frames()[0], "C1|status\r\n");
        assert_eq!(link.last_seq(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn smartsdr_frames_use_lf() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;
        link.send_command_no_wait("transmit tune on").await.unwrap();
        assert_eq!(script.sent_frames(), vec!["C1|transmit tune on\n"]);
    }

    // -- Reply matching -------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn unsolicited_lines_before_reply_are_scanned() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;
        for _ in 0..6 {
            link.send_command_no_wait("slice s 0 tx=1").await.unwrap();
        }

        script.push_line("S1A2B3C4D|radio band_persistence_enabled=0");
        script.push_line("R7|0|");
        let reply = link
            .send("slice t 0 7.150000", true, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.seq, 7);
        assert_eq!(link.cached().get_bool("band_persistence_enabled"), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn marker_match_is_exact() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        script.push_line("R12|0|wrong=1");
        script.push_line("R1|0|right=1");
        let reply = link.send("info", true, Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(reply.get("right"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn lines_after_reply_stay_buffered() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        script.push_line("R1|0|");
        script.push_line("S0|radio band_persistence_enabled=1");
        link.send_command("info").await.unwrap();
        assert_eq!(link.cached().get("band_persistence_enabled"), None);

        link.drain(Duration::from_millis(100)).await.unwrap();
        assert_eq!(link.cached().get_bool("band_persistence_enabled"), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn reply_split_across_reads() {
        let script = ScriptedTransport::new();
        script.set_chunk_size(3);
        script.reply_to("status", "0|vdd=48.1 id=2.3");
        let mut link = ready_link(Dialect::pgxl(), &script).await;

        let reply = link.send_command("status").await.unwrap();
        assert_eq!(reply.get_f64("id"), Some(2.3));
    }

    // -- Stray replies --------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn smartsdr_tolerates_stray_reply() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        script.push_line("R99|0|");
        script.push_line("R1|0|ok=1");
        let reply = link.send_command("info").await.unwrap();
        assert_eq!(reply.get("ok"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn pgxl_rejects_stray_reply() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::pgxl(), &script).await;

        script.push_line("R99|0|");
        script.push_line("R1|0|ok=1");
        let err = link.send_command("info").await.unwrap_err();
        assert!(matches!(
            err,
            Error::SequenceMismatch {
                expected: 1,
                got: 99
            }
        ));
        assert_eq!(link.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn pgxl_late_reply_forces_reconnect() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::pgxl(), &script).await;
        assert!(matches!(
            link.send_command("status").await,
            Err(Error::Timeout { seq: 1, .. })
        ));

        script.push_line("R1|0|late=1");
        script.push_line("R2|0|ok=2");
        let err = link.send_command("status").await.unwrap_err();
        assert!(matches!(err, Error::SequenceMismatch { expected: 2, got: 1 }));
        assert_eq!(link.state(), SessionState::Disconnected);
        assert_eq!(link.framer.buffered(), 0);

        let fresh = ScriptedTransport::new();
        fresh.reply_to("status", "0|vdd=48.1");
        link.connect_with_transport(Box::new(fresh.clone()))
            .await
            .unwrap();
        for expected in 1..=3 {
            let reply = link.send_command("status").await.unwrap();
            assert_eq!(reply.seq, expected);
        }
        assert_eq!(fresh.sent_sequences(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_matching_reply() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::pgxl(), &script).await;

        // Carries the marker but no payload separator.
        script.push_line("R1|0");
        let err = link.send_command("status").await.unwrap_err();
        assert!(matches!(err, Error::MalformedReply(_)));
    }

    // -- Timeouts and failures ------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn timeout_names_sequence_and_body() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::pgxl(), &script).await;
        link.send_command_no_wait("operate=1").await.unwrap();

        let started = Instant::now();
        let err = link.send_command("status").await.unwrap_err();
        match err {
            Error::Timeout { seq, body } => {
                assert_eq!(seq, 2);
                assert_eq!(body, "status");
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(link.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_does_not_satisfy_next_command() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;
        assert!(link.send_command("info").await.is_err());

        script.push_line("R1|0|late=1");
        script.push_line("R2|0|fresh=1");
        let reply = link.send_command("info").await.unwrap();
        assert_eq!(reply.seq, 2);
        assert_eq!(reply.get("fresh"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn peer_close_while_waiting() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        script.push_line("S0|radio slices=4");
        script.close_peer();
        let err = link.send_command("info").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionLost));
        assert_eq!(link.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_closes_session() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::pgxl(), &script).await;

        script.fail_sends();
        let err = link.send_command("status").await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(link.state(), SessionState::Disconnected);

        let err = link.send_command("status").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_closes_session() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::pgxl(), &script).await;

        script.fail_receives();
        let err = link.send_command("status").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionLost));
        assert_eq!(link.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_read_failure_closes_session() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        script.fail_receives();
        assert!(matches!(
            link.drain(Duration::from_millis(100)).await,
            Err(Error::ConnectionLost)
        ));
        assert_eq!(link.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_sequence_is_never_reused() {
        let script = ScriptedTransport::new();
        let mut link = ready_link(Dialect::pgxl(), &script).await;
        link.seq = u32::MAX;

        let err = link.send_command_no_wait("operate=1").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(script.sent_frames().is_empty());
        assert_eq!(link.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn send_before_connect() {
        let mut link = LineLink::new(LinkConfig::new(Dialect::pgxl()));
        assert!(matches!(
            link.send_command("status").await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            link.send_command_no_wait("operate=1").await,
            Err(Error::NotConnected)
        ));
        assert_eq!(link.last_seq(), 0);
    }

    // -- Status ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn nonzero_status_is_rejected() {
        let script = ScriptedTransport::new();
        script.reply_to("slice s 0 mode=XYZ", "50000016|bad mode");
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        let err = link.send_command("slice s 0 mode=XYZ").await.unwrap_err();
        match err {
            Error::Rejected { status, body } => {
                assert_eq!(status, "50000016");
                assert_eq!(body, "slice s 0 mode=XYZ");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn raw_send_returns_rejected_reply_as_is() {
        let script = ScriptedTransport::new();
        script.reply_to("bogus", "50000016|");
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        let reply = link
            .send("bogus", true, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert!(!reply.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn best_effort_reports_outcome() {
        let script = ScriptedTransport::new();
        script.reply_to("good", "0|");
        script.reply_to("bad", "1|");
        let mut link = ready_link(Dialect::smartsdr(), &script).await;

        assert!(link.send_best_effort("good", true).await);
        assert!(!link.send_best_effort("bad", true).await);
        assert!(!link.send_best_effort("silent", true).await);
        assert!(link.is_ready());
    }
}
