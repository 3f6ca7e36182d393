//! Scripted in-memory transport for deterministic line-protocol tests.
//!
//! [`ScriptedTransport`] implements the [`Transport`] trait over an in-memory
//! byte queue. Tests preload unsolicited lines (banners, status bursts) and
//! register reply rules keyed on command bodies; when the engine sends
//! `C<seq>|<body>`, a matching rule queues `R<seq>|<tail>` for the next read.
//!
//! The transport is a cheap clone around shared state, so a test can keep
//! one handle for inspection after boxing another into a session.
//!
//! # Example
//!
//! ```
//! use pgxl_test_harness::ScriptedTransport;
//!
//! let script = ScriptedTransport::new();
//! script.push_line("V1.4.0.0");
//! script.reply_to("status", "0|vdd=48.1 id=2.3");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pgxl_core::error::{Error, Result};
use pgxl_core::transport::Transport;

#[derive(Debug, Clone)]
struct ReplyRule {
    body: String,
    tail: String,
}

#[derive(Debug)]
struct Inner {
    incoming: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    rules: Vec<ReplyRule>,
    reply_terminator: String,
    chunk_size: usize,
    connected: bool,
    peer_closed: bool,
    fail_sends: bool,
    fail_receives: bool,
}

/// An in-memory [`Transport`] driven by scripted lines and reply rules.
///
/// Reads that find nothing queued sleep for the full read timeout and then
/// return [`Error::ReadTimeout`], so timeout paths behave like a silent
/// socket. Combine with `#[tokio::test(start_paused = true)]` to make those
/// waits instantaneous.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedTransport {
    /// Create a connected transport with nothing queued.
    pub fn new() -> Self {
        ScriptedTransport {
            inner: Arc::new(Mutex::new(Inner {
                incoming: VecDeque::new(),
                sent: Vec::new(),
                rules: Vec::new(),
                reply_terminator: "\n".to_string(),
                chunk_size: 4096,
                connected: true,
                peer_closed: false,
                fail_sends: false,
                fail_receives: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue raw bytes for the next reads.
    pub fn push_bytes(&self, data: &[u8]) {
        self.lock().incoming.extend(data.iter().copied());
    }

    /// Queue one line (a `\n` terminator is appended).
    pub fn push_line(&self, line: &str) {
        self.push_bytes(format!("{line}\n").as_bytes());
    }

    /// Reply `R<seq>|<tail>` every time a command with exactly `body` is sent.
    ///
    /// `tail` is everything after the sequence number, e.g. `"0|vdd=48.1"`.
    pub fn reply_to(&self, body: &str, tail: &str) {
        self.lock().rules.push(ReplyRule {
            body: body.to_string(),
            tail: tail.to_string(),
        });
    }

    /// Terminator appended to generated replies (default `\n`).
    pub fn set_reply_terminator(&self, terminator: &str) {
        self.lock().reply_terminator = terminator.to_string();
    }

    /// Deliver at most `n` bytes per read, to exercise partial-line handling.
    pub fn set_chunk_size(&self, n: usize) {
        self.lock().chunk_size = n.max(1);
    }

    /// Simulate the peer closing: once queued bytes drain, reads fail with
    /// [`Error::ConnectionLost`].
    pub fn close_peer(&self) {
        self.lock().peer_closed = true;
    }

    /// Make every subsequent `send()` fail with [`Error::ConnectionLost`].
    pub fn fail_sends(&self) {
        self.lock().fail_sends = true;
    }

    /// Make every subsequent `receive()` fail with an I/O error.
    pub fn fail_receives(&self) {
        self.lock().fail_receives = true;
    }

    /// Every frame written so far, decoded as text.
    pub fn sent_frames(&self) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }

    /// Command bodies of every counted frame written so far.
    pub fn sent_bodies(&self) -> Vec<String> {
        self.sent_frames()
            .iter()
            .filter_map(|f| split_frame(f).map(|(_, body)| body.to_string()))
            .collect()
    }

    /// Sequence numbers of every counted frame written so far.
    pub fn sent_sequences(&self) -> Vec<u32> {
        self.sent_frames()
            .iter()
            .filter_map(|f| split_frame(f).map(|(seq, _)| seq))
            .collect()
    }

    /// Number of bytes still queued for reading.
    pub fn pending_bytes(&self) -> usize {
        self.lock().incoming.len()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `C<seq>|<body>` (with any terminator) into its parts.
fn split_frame(frame: &str) -> Option<(u32, &str)> {
    let rest = frame.strip_prefix('C')?;
    let (seq, body) = rest.split_once('|')?;
    Some((seq.parse().ok()?, body.trim_end_matches(['\r', '\n'])))
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        if inner.fail_sends {
            return Err(Error::ConnectionLost);
        }
        inner.sent.push(data.to_vec());

        let frame = String::from_utf8_lossy(data).into_owned();
        if let Some((seq, body)) = split_frame(&frame) {
            let reply = inner
                .rules
                .iter()
                .find(|rule| rule.body == body)
                .map(|rule| format!("R{seq}|{}{}", rule.tail, inner.reply_terminator));
            if let Some(reply) = reply {
                inner.incoming.extend(reply.into_bytes());
            }
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        {
            let mut inner = self.lock();
            if !inner.connected {
                return Err(Error::NotConnected);
            }
            if inner.fail_receives {
                return Err(Error::Io(std::io::Error::other("scripted read failure")));
            }
            if !inner.incoming.is_empty() {
                let n = inner.incoming.len().min(buf.len()).min(inner.chunk_size);
                for (slot, byte) in buf.iter_mut().zip(inner.incoming.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            if inner.peer_closed {
                return Err(Error::ConnectionLost);
            }
        }
        tokio::time::sleep(timeout).await;
        Err(Error::ReadTimeout)
    }

    async fn close(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.connected = false;
        inner.incoming.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reply_rule_echoes_sequence() {
        let mut script = ScriptedTransport::new();
        script.reply_to("status", "0|vdd=48.1");

        script.send(b"C12|status\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = script
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"R12|0|vdd=48.1\n");
        assert_eq!(script.sent_bodies(), vec!["status"]);
        assert_eq!(script.sent_sequences(), vec![12]);
    }

    #[tokio::test]
    async fn unmatched_command_queues_nothing() {
        let mut script = ScriptedTransport::new();
        script.send(b"C1|transmit tune on\n").await.unwrap();
        assert_eq!(script.pending_bytes(), 0);
    }

    #[tokio::test]
    async fn chunked_reads() {
        let mut script = ScriptedTransport::new();
        script.set_chunk_size(3);
        script.push_line("S0|abc");

        let mut buf = [0u8; 64];
        let n = script
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"S0|");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_read_times_out() {
        let mut script = ScriptedTransport::new();
        let mut buf = [0u8; 8];
        let result = script.receive(&mut buf, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(Error::ReadTimeout)));
    }

    #[tokio::test]
    async fn peer_close_after_drain() {
        let mut script = ScriptedTransport::new();
        script.push_line("bye");
        script.close_peer();

        let mut buf = [0u8; 64];
        assert!(script.receive(&mut buf, Duration::from_millis(10)).await.is_ok());
        assert!(matches!(
            script.receive(&mut buf, Duration::from_millis(10)).await,
            Err(Error::ConnectionLost)
        ));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let handle = ScriptedTransport::new();
        let mut boxed: Box<dyn Transport> = Box::new(handle.clone());
        boxed.send(b"C1|info\n").await.unwrap();
        boxed.close().await.unwrap();

        assert_eq!(handle.sent_bodies(), vec!["info"]);
        assert!(!handle.is_connected());
    }
}
