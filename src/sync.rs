//! Deciding what to do with a record found in the synchronization slot.
//!
//! The slot only ever holds the latest record, so a slow poller can miss
//! intermediate writes. Each record carries its writer's tab id and a
//! per-writer sequence number; a jump in that sequence means something was
//! missed and the reader must rebuild from the persisted snapshot first.

use crate::protocol::SyncRecord;
use crate::types::TabId;
use std::collections::HashMap;

/// What the poller should do with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Replay the action
    Apply,
    /// Records were missed: reload the snapshot, then replay restore-safe
    Resync,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Written by this very tab
    OwnRecord,
    /// Not newer than the last record this tab processed
    AlreadyProcessed,
    /// Not newer than this tab's own latest mutation
    BehindLocalClock,
}

/// Per-tab read position in the synchronization stream
#[derive(Debug, Clone, Default)]
pub struct SyncCursor {
    last_processed: i64,
    last_seq: HashMap<TabId, u64>,
}

impl SyncCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_processed(&self) -> i64 {
        self.last_processed
    }

    /// Judge a record and move the cursor past it.
    ///
    /// Every record that is not a repeat advances the cursor, including
    /// skipped ones, so their sequence numbers do not later look like a gap.
    pub fn admit(&mut self, record: &SyncRecord, tab_id: &str, local_clock: i64) -> Verdict {
        let verdict = self.judge(record, tab_id, local_clock);
        if verdict != Verdict::Skip(SkipReason::AlreadyProcessed) {
            self.advance(record);
        }
        verdict
    }

    fn judge(&self, record: &SyncRecord, tab_id: &str, local_clock: i64) -> Verdict {
        if record.origin.as_deref() == Some(tab_id) {
            return Verdict::Skip(SkipReason::OwnRecord);
        }
        if record.timestamp <= self.last_processed {
            return Verdict::Skip(SkipReason::AlreadyProcessed);
        }
        if record.timestamp <= local_clock {
            return Verdict::Skip(SkipReason::BehindLocalClock);
        }
        if self.has_gap(record) {
            Verdict::Resync
        } else {
            Verdict::Apply
        }
    }

    /// Records without origin or sequence (older writers) never signal a gap
    fn has_gap(&self, record: &SyncRecord) -> bool {
        let Some(origin) = &record.origin else {
            return false;
        };
        if record.seq == 0 {
            return false;
        }
        match self.last_seq.get(origin) {
            Some(&last) => record.seq > last + 1,
            None => record.seq > 1,
        }
    }

    /// Mark a record as seen without judging it (startup adoption)
    pub fn advance(&mut self, record: &SyncRecord) {
        self.last_processed = self.last_processed.max(record.timestamp);
        if let Some(origin) = &record.origin {
            let last = self.last_seq.entry(origin.clone()).or_insert(0);
            *last = (*last).max(record.seq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SyncAction;

    fn record(origin: &str, seq: u64, timestamp: i64, action: SyncAction) -> SyncRecord {
        SyncRecord {
            action,
            timestamp,
            origin: Some(origin.to_string()),
            seq,
        }
    }

    fn select(origin: &str, seq: u64, timestamp: i64) -> SyncRecord {
        record(origin, seq, timestamp, SyncAction::SelectQuestion { question_id: 1 })
    }

    #[test]
    fn test_same_record_twice_is_filtered() {
        let mut cursor = SyncCursor::new();
        let rec = select("host", 1, 100);

        assert_eq!(cursor.admit(&rec, "player", 0), Verdict::Apply);
        assert_eq!(
            cursor.admit(&rec, "player", 0),
            Verdict::Skip(SkipReason::AlreadyProcessed)
        );
        assert_eq!(cursor.last_processed(), 100);
    }

    #[test]
    fn test_own_record_is_skipped() {
        let mut cursor = SyncCursor::new();
        let rec = select("host", 1, 100);
        assert_eq!(
            cursor.admit(&rec, "host", 0),
            Verdict::Skip(SkipReason::OwnRecord)
        );
    }

    #[test]
    fn test_record_behind_local_clock_is_skipped() {
        let mut cursor = SyncCursor::new();
        let rec = select("admin", 1, 100);
        assert_eq!(
            cursor.admit(&rec, "host", 100),
            Verdict::Skip(SkipReason::BehindLocalClock)
        );
        // Still counted as seen
        assert_eq!(cursor.last_processed(), 100);
    }

    #[test]
    fn test_skipped_record_still_tracks_sequence() {
        let mut cursor = SyncCursor::new();
        assert_eq!(
            cursor.admit(&select("host", 1, 100), "admin", 100),
            Verdict::Skip(SkipReason::BehindLocalClock)
        );

        let points = record(
            "host",
            2,
            200,
            SyncAction::UpdateTeamPoints {
                team_id: 1,
                delta: 10,
            },
        );
        assert_eq!(cursor.admit(&points, "admin", 100), Verdict::Apply);
    }

    #[test]
    fn test_sequence_gap_requests_resync() {
        let mut cursor = SyncCursor::new();
        assert_eq!(cursor.admit(&select("host", 1, 100), "p", 0), Verdict::Apply);
        assert_eq!(cursor.admit(&select("host", 2, 200), "p", 0), Verdict::Apply);
        assert_eq!(cursor.admit(&select("host", 5, 300), "p", 0), Verdict::Resync);
        assert_eq!(cursor.admit(&select("host", 6, 400), "p", 0), Verdict::Apply);
    }

    #[test]
    fn test_unknown_origin_midstream_requests_resync() {
        let mut cursor = SyncCursor::new();
        assert_eq!(cursor.admit(&select("admin", 7, 100), "p", 0), Verdict::Resync);
    }

    #[test]
    fn test_anonymous_records_never_resync() {
        let mut cursor = SyncCursor::new();
        let rec = SyncRecord {
            action: SyncAction::ShowAnswer {},
            timestamp: 10,
            origin: None,
            seq: 0,
        };
        assert_eq!(cursor.admit(&rec, "p", 0), Verdict::Apply);
    }

    #[test]
    fn test_adopted_record_sets_baseline() {
        let mut cursor = SyncCursor::new();
        cursor.advance(&select("host", 9, 500));

        assert_eq!(
            cursor.admit(&select("host", 9, 500), "p", 0),
            Verdict::Skip(SkipReason::AlreadyProcessed)
        );
        assert_eq!(cursor.admit(&select("host", 10, 600), "p", 0), Verdict::Apply);
    }
}
