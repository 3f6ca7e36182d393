//! Last-seen values of asynchronously pushed device state.
//!
//! Devices push state changes as unsolicited lines, e.g.
//! `S3A1B2C3D|radio band_persistence_enabled=1 slices=4`. The tracker
//! watches a fixed set of field names and records the latest value seen for
//! each, so drivers can answer queries without a round trip.

use std::collections::{BTreeMap, BTreeSet};

/// Cache of watched `key=value` fields scanned from unsolicited lines.
#[derive(Debug, Clone, Default)]
pub struct CachedState {
    watched: BTreeSet<String>,
    values: BTreeMap<String, String>,
}

impl CachedState {
    /// Create a tracker watching the given field names.
    pub fn new<I, S>(watched: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CachedState {
            watched: watched.into_iter().map(Into::into).collect(),
            values: BTreeMap::new(),
        }
    }

    /// Start watching another field.
    pub fn watch(&mut self, key: &str) {
        self.watched.insert(key.to_string());
    }

    /// Whether `key` is watched.
    pub fn is_watched(&self, key: &str) -> bool {
        self.watched.contains(key)
    }

    /// Scan one line for watched fields and record their values.
    ///
    /// Tokens are split on whitespace and `|`, so a field directly after the
    /// status handle (`S0|band_persistence_enabled=1`) is found too. Returns
    /// the number of fields updated.
    pub fn scan(&mut self, line: &str) -> usize {
        if self.watched.is_empty() {
            return 0;
        }
        let mut updated = 0;
        for token in line.split(|c: char| c.is_whitespace() || c == '|') {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            if self.watched.contains(key) {
                tracing::trace!(key, value, "cached state updated");
                self.values.insert(key.to_string(), value.to_string());
                updated += 1;
            }
        }
        updated
    }

    /// Last value seen for `key`, or `None` while unknown.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Last value seen for `key` read as a flag (`1`/`0`, `true`/`false`,
    /// `on`/`off`); `None` while unknown or unrecognised.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" => Some(true),
            "0" | "false" | "off" => Some(false),
            _ => None,
        }
    }

    /// Forget every value; watched fields become unknown again.
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_until_seen() {
        let cache = CachedState::new(["band_persistence_enabled"]);
        assert_eq!(cache.get("band_persistence_enabled"), None);
        assert_eq!(cache.get_bool("band_persistence_enabled"), None);
    }

    #[test]
    fn scan_status_line() {
        let mut cache = CachedState::new(["band_persistence_enabled"]);
        let n = cache.scan("S3A1B2C3D|radio slices=4 band_persistence_enabled=1 model=FLEX-6600");
        assert_eq!(n, 1);
        assert_eq!(cache.get_bool("band_persistence_enabled"), Some(true));
        assert_eq!(cache.get("slices"), None);
    }

    #[test]
    fn scan_field_after_pipe() {
        let mut cache = CachedState::new(["band_persistence_enabled"]);
        cache.scan("S0|band_persistence_enabled=0");
        assert_eq!(cache.get_bool("band_persistence_enabled"), Some(false));
    }

    #[test]
    fn later_value_wins() {
        let mut cache = CachedState::new(["band_persistence_enabled"]);
        cache.scan("S0|radio band_persistence_enabled=1");
        cache.scan("S0|radio band_persistence_enabled=0");
        assert_eq!(cache.get_bool("band_persistence_enabled"), Some(false));
    }

    #[test]
    fn ignores_lines_without_watched_fields() {
        let mut cache = CachedState::new(["band_persistence_enabled"]);
        assert_eq!(cache.scan("S status updating"), 0);
        assert_eq!(cache.scan("V1.4.0.0"), 0);
    }

    #[test]
    fn unrecognised_flag_value() {
        let mut cache = CachedState::new(["band_persistence_enabled"]);
        cache.scan("S0|radio band_persistence_enabled=maybe");
        assert_eq!(cache.get("band_persistence_enabled"), Some("maybe"));
        assert_eq!(cache.get_bool("band_persistence_enabled"), None);
    }

    #[test]
    fn watch_and_reset() {
        let mut cache = CachedState::default();
        assert_eq!(cache.scan("S0|amp fault=none"), 0);

        cache.watch("fault");
        assert!(cache.is_watched("fault"));
        cache.scan("S0|amp fault=HIGH_SWR");
        assert_eq!(cache.get("fault"), Some("HIGH_SWR"));

        cache.reset();
        assert_eq!(cache.get("fault"), None);
        assert!(cache.is_watched("fault"));
    }
}
