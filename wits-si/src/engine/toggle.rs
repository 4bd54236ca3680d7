//! Presence toggle decision
//!
//! The state machine at the center of the engine: given the current record
//! for a key (if any) and the scan time, decide whether to create, flip, or
//! ignore. Physical RFID gates re-read a tag continuously while it is near
//! the reader; the cooldown converts that stream of reads into discrete
//! "crossed the gate" events.
//!
//! The decision is a pure function; persistence and locking live in the
//! pipeline so the rule itself stays trivially testable.

use crate::db::presence::PresenceRecord;
use chrono::{DateTime, Duration, Utc};
use wits_common::PresenceStatus;

/// Outcome of evaluating a scan against the current record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
    /// First-ever scan for the key: create the record with status `in`
    Create,
    /// Cooldown elapsed: flip to the given status
    Flip { to: PresenceStatus },
    /// Within the cooldown: acknowledge but leave state unchanged
    Ignore,
}

/// Evaluate a scan at `now` against the existing record for its key
///
/// The boundary is inclusive: a scan arriving exactly `cooldown` after the
/// last transition flips the state.
pub fn decide(
    existing: Option<&PresenceRecord>,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> ToggleDecision {
    match existing {
        None => ToggleDecision::Create,
        Some(record) => {
            let elapsed = now.signed_duration_since(record.last_transition_at);
            if elapsed < cooldown {
                ToggleDecision::Ignore
            } else {
                ToggleDecision::Flip {
                    to: record.status.toggled(),
                }
            }
        }
    }
}
