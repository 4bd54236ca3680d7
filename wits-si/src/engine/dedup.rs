//! Duplicate scan filter
//!
//! Short-horizon de-duplication, independent of the toggle cooldown: a
//! physical tag pass causes the reader to poll the same tag many times per
//! second, and only the first read of each burst should reach the toggle
//! engine. Runs before the toggle decision, inside the per-key critical
//! section.

use crate::db::presence::PresenceKey;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Suppresses re-processing of an identical read within the suppression window
pub struct DuplicateFilter {
    window: Duration,
    last_seen: Mutex<HashMap<PresenceKey, DateTime<Utc>>>,
}

impl DuplicateFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Decide accept/suppress for a scan of `key` observed at `now`
    ///
    /// Returns `true` when the scan is accepted (and the last-seen timestamp
    /// updated), `false` when it is suppressed. A suppressed scan does not
    /// refresh the timestamp, so a steady read storm still passes one scan
    /// per window.
    pub fn check_and_update(&self, key: &PresenceKey, now: DateTime<Utc>) -> bool {
        let mut map = self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(last) = map.get(key) {
            if now.signed_duration_since(*last) < self.window {
                return false;
            }
        }
        map.insert(key.clone(), now);
        true
    }

    /// Drop entries whose window has long expired, bounding map growth.
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut map = self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = map.len();
        map.retain(|_, last| now.signed_duration_since(*last) < self.window);
        before - map.len()
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
