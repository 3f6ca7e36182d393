//! Counted line-protocol framing shared by the PGXL and SmartSDR dialects.
//!
//! Both devices speak the same skeleton over TCP:
//!
//! ```text
//! C<seq>|<body>                      client -> device
//! R<seq>|<status>|k=v k=v ...        device -> client, answers C<seq>
//! <anything else>                    device -> client, unsolicited
//! ```
//!
//! The per-device differences (line terminator, how to treat a reply to a
//! sequence that is not pending) live in [`Dialect`].

use std::collections::BTreeMap;

use pgxl_core::error::{Error, Result};

/// What to do with a reply whose sequence number is not the pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrayReplyPolicy {
    /// Route it to the state scanner and keep waiting.
    Tolerate,
    /// Fail the pending transaction with [`Error::SequenceMismatch`] and
    /// close the session.
    Reject,
}

/// Framing parameters for one device family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Short name used in logs.
    pub name: &'static str,
    /// Leading tag of outgoing commands.
    pub command_prefix: char,
    /// Leading tag of replies.
    pub reply_prefix: char,
    /// Terminator appended to outgoing commands.
    pub terminator: &'static str,
    /// Handling of replies to sequences other than the pending one.
    pub stray_replies: StrayReplyPolicy,
}

impl Dialect {
    /// Power Genius XL amplifier: CRLF-terminated, strict sequencing.
    pub const fn pgxl() -> Self {
        Dialect {
            name: "pgxl",
            command_prefix: 'C',
            reply_prefix: 'R',
            terminator: "\r\n",
            stray_replies: StrayReplyPolicy::Reject,
        }
    }

    /// FlexRadio SmartSDR command port: LF-terminated, stray replies tolerated.
    pub const fn smartsdr() -> Self {
        Dialect {
            name: "smartsdr",
            command_prefix: 'C',
            reply_prefix: 'R',
            terminator: "\n",
            stray_replies: StrayReplyPolicy::Tolerate,
        }
    }

    /// Encode `C<seq>|<body><terminator>`.
    pub fn encode(&self, seq: u32, body: &str) -> Vec<u8> {
        format!("{}{seq}|{body}{}", self.command_prefix, self.terminator).into_bytes()
    }

    /// The exact prefix a reply to `seq` starts with, e.g. `R7|`.
    pub fn reply_marker(&self, seq: u32) -> String {
        format!("{}{seq}|", self.reply_prefix)
    }

    /// Classify a received line by its leading tag.
    pub fn classify(&self, line: &str) -> LineKind {
        if let Some(seq) = tagged_seq(line, self.reply_prefix) {
            return LineKind::Reply { seq };
        }
        if tagged_seq(line, self.command_prefix).is_some() {
            return LineKind::Command;
        }
        LineKind::Unsolicited
    }
}

/// The three shapes a framed line can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `R<seq>|...`
    Reply {
        /// Sequence number the reply answers.
        seq: u32,
    },
    /// `C<seq>|...`, only ever sent; seen inbound only from a misbehaving peer.
    Command,
    /// Status pushes, banners and anything else.
    Unsolicited,
}

/// `<tag><digits>|` at the start of `line` -> the digits.
fn tagged_seq(line: &str, tag: char) -> Option<u32> {
    let rest = line.strip_prefix(tag)?;
    let (digits, _) = rest.split_once('|')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// A parsed `R<seq>|<status>|<fields>` reply.
///
/// Values stay strings here; numeric coercion belongs to the device drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Sequence number echoed by the device.
    pub seq: u32,
    /// Raw status token.
    pub status: String,
    /// `key=value` tokens from the payload.
    pub fields: BTreeMap<String, String>,
}

impl Reply {
    /// Value of a payload field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Numeric value of a payload field; `None` if absent or not a number.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        pgxl_core::parse_f64(self.fields.get(key))
    }

    /// `true` unless the status is a non-zero hex error code.
    ///
    /// An empty or non-numeric status is treated as success.
    pub fn is_success(&self) -> bool {
        let status = self.status.trim();
        if status.is_empty() {
            return true;
        }
        match u32::from_str_radix(status, 16) {
            Ok(code) => code == 0,
            Err(_) => true,
        }
    }
}

/// Parse a reply line, checking it answers `expected_seq`.
///
/// Fails with [`Error::MalformedReply`] if the line lacks the reply tag,
/// has fewer than two `|` separators, or carries a non-numeric sequence,
/// and with [`Error::SequenceMismatch`] if the sequence differs.
pub fn parse_reply(line: &str, reply_prefix: char, expected_seq: u32) -> Result<Reply> {
    let mut parts = line.splitn(3, '|');
    let (Some(head), Some(status), Some(blob)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::MalformedReply(line.to_string()));
    };

    let seq = head
        .strip_prefix(reply_prefix)
        .and_then(|digits| digits.trim().parse::<u32>().ok())
        .ok_or_else(|| Error::MalformedReply(line.to_string()))?;

    if seq != expected_seq {
        return Err(Error::SequenceMismatch {
            expected: expected_seq,
            got: seq,
        });
    }

    Ok(Reply {
        seq,
        status: status.trim().to_string(),
        fields: parse_fields(blob),
    })
}

/// Split a whitespace-separated `key=value` list. Tokens without `=` are
/// skipped; a value may itself contain `=`.
pub fn parse_fields(blob: &str) -> BTreeMap<String, String> {
    blob.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
