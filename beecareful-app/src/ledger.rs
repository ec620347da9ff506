//! Ordering of hive position writes.
//!
//! Every drag end issues a new revision for its hive. When the responses
//! come back out of order, only the newest revision is applied; older ones
//! are dropped. The newest position the server confirmed is kept so a
//! failed newest write can put the marker back, even when that position
//! came from a superseded write.

use beecareful_map::{HiveId, Point};
use std::collections::HashMap;
use tracing::debug;

pub type Revision = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Settled {
    /// The response belongs to the newest write.
    Latest,
    /// A newer write was issued since; ignore this response.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    issued: Revision,
    confirmed: Option<Point>,
    /// Revision that produced `confirmed`.
    confirmed_rev: Revision,
}

impl Entry {
    const EMPTY: Entry = Entry { issued: 0, confirmed: None, confirmed_rev: 0 };
}

#[derive(Debug, Default)]
pub struct PositionLedger {
    entries: HashMap<HiveId, Entry>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the server-side position of a hive without issuing a write.
    pub fn confirm(&mut self, id: HiveId, position: Point) {
        let entry = self.entries.entry(id).or_insert(Entry::EMPTY);
        entry.confirmed = Some(position);
        entry.confirmed_rev = entry.issued;
    }

    pub fn issue(&mut self, id: HiveId) -> Revision {
        let entry = self.entries.entry(id).or_insert(Entry::EMPTY);
        entry.issued += 1;
        entry.issued
    }

    pub fn latest(&self, id: HiveId) -> Option<Revision> {
        self.entries.get(&id).map(|e| e.issued).filter(|r| *r > 0)
    }

    /// Successful write of `revision` placing the hive at `position`.
    ///
    /// A superseded success is not applied to the map, but still moves the
    /// confirmed position forward if nothing newer was confirmed yet.
    pub fn settle_success(&mut self, id: HiveId, revision: Revision, position: Point) -> Settled {
        let Some(entry) = self.entries.get_mut(&id) else {
            debug!("hive {} no longer tracked, response dropped", id);
            return Settled::Stale;
        };
        if revision > entry.confirmed_rev {
            entry.confirmed = Some(position);
            entry.confirmed_rev = revision;
        }
        if entry.issued == revision {
            Settled::Latest
        } else {
            debug!("hive {} revision {} superseded, response dropped", id, revision);
            Settled::Stale
        }
    }

    /// Failed write. For the newest revision, returns the position to restore.
    pub fn settle_failure(&mut self, id: HiveId, revision: Revision) -> (Settled, Option<Point>) {
        match self.entries.get(&id) {
            Some(entry) if entry.issued == revision => (Settled::Latest, entry.confirmed),
            _ => (Settled::Stale, None),
        }
    }

    pub fn forget(&mut self, id: HiveId) {
        self.entries.remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revisions_increase_per_hive() {
        let mut ledger = PositionLedger::new();
        assert_eq!(ledger.latest(1), None);
        assert_eq!(ledger.issue(1), 1);
        assert_eq!(ledger.issue(1), 2);
        assert_eq!(ledger.issue(2), 1);
        assert_eq!(ledger.latest(1), Some(2));
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut ledger = PositionLedger::new();
        let first = ledger.issue(1);
        let second = ledger.issue(1);

        // second answers before first
        assert_eq!(ledger.settle_success(1, second, Point::new(600.0, 600.0)), Settled::Latest);
        assert_eq!(ledger.settle_success(1, first, Point::new(300.0, 300.0)), Settled::Stale);

        let third = ledger.issue(1);
        let (settled, restore) = ledger.settle_failure(1, third);
        assert_eq!(settled, Settled::Latest);
        assert_eq!(restore, Some(Point::new(600.0, 600.0)));
    }

    #[test]
    fn test_failure_of_old_revision_restores_nothing() {
        let mut ledger = PositionLedger::new();
        ledger.confirm(1, Point::new(100.0, 100.0));
        let first = ledger.issue(1);
        ledger.issue(1);
        assert_eq!(ledger.settle_failure(1, first), (Settled::Stale, None));
    }

    #[test]
    fn test_superseded_success_becomes_restore_point() {
        let mut ledger = PositionLedger::new();
        ledger.confirm(1, Point::new(500.0, 500.0));
        let first = ledger.issue(1);
        let second = ledger.issue(1);

        assert_eq!(ledger.settle_success(1, first, Point::new(700.0, 500.0)), Settled::Stale);
        let (settled, restore) = ledger.settle_failure(1, second);
        assert_eq!(settled, Settled::Latest);
        assert_eq!(restore, Some(Point::new(700.0, 500.0)));
    }

    #[test]
    fn test_older_success_does_not_override_newer_confirmation() {
        let mut ledger = PositionLedger::new();
        let first = ledger.issue(1);
        let second = ledger.issue(1);
        assert_eq!(ledger.settle_success(1, second, Point::new(600.0, 600.0)), Settled::Latest);
        assert_eq!(ledger.settle_success(1, first, Point::new(300.0, 300.0)), Settled::Stale);

        let third = ledger.issue(1);
        assert_eq!(ledger.settle_failure(1, third).1, Some(Point::new(600.0, 600.0)));
    }

    #[test]
    fn test_forget() {
        let mut ledger = PositionLedger::new();
        let rev = ledger.issue(4);
        ledger.forget(4);
        assert_eq!(ledger.settle_success(4, rev, Point::new(1.0, 1.0)), Settled::Stale);
    }
}
