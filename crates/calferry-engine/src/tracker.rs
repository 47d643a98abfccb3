//! Duplicate suppression.
//!
//! The ledger maps stable identifiers to the remote identity of the event
//! already holding them; the tracker is the single place that turns ledger
//! membership into an admit/skip decision.

use std::collections::{HashMap, HashSet};

use tracing::debug;

/// The admission decision for one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Not seen before: commit it.
    Proceed,
    /// Already on the target calendar (or earlier in this stream): skip.
    SkipDuplicate,
}

/// Mapping from stable identifier to remote event identity.
///
/// Pre-populated at run start from the target calendar; the executor adds
/// entries only after a confirmed successful commit. Entries are never
/// removed during a run.
#[derive(Debug, Default)]
pub struct ImportLedger {
    entries: HashMap<String, Option<String>>,
}

impl ImportLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger seeded with identifiers already present on the target.
    /// Prefetched entries have no locally known remote id.
    pub fn prefetched(uids: HashSet<String>) -> Self {
        let entries = uids.into_iter().map(|uid| (uid, None)).collect();
        Self { entries }
    }

    /// Returns true if the identifier is known.
    pub fn contains(&self, uid: &str) -> bool {
        self.entries.contains_key(uid)
    }

    /// Records a confirmed commit.
    pub fn record(&mut self, uid: impl Into<String>, remote_id: Option<String>) {
        self.entries.insert(uid.into(), remote_id);
    }

    /// Number of known identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no identifiers are known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides skip vs. proceed for each event before any network commit.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateTracker {
    skip_duplicates: bool,
}

impl DuplicateTracker {
    /// Creates a tracker; with `skip_duplicates = false` every event is
    /// admitted.
    pub fn new(skip_duplicates: bool) -> Self {
        Self { skip_duplicates }
    }

    /// Admits or skips the given identifier.
    pub fn admit(&self, ledger: &ImportLedger, uid: &str) -> Admission {
        if self.skip_duplicates && ledger.contains(uid) {
            debug!(uid, "skipping duplicate");
            Admission::SkipDuplicate
        } else {
            Admission::Proceed
        }
    }
}
