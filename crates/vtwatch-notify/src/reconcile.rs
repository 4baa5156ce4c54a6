//! The reconciliation engine: pure key-set diff between what is posted and
//! what is live. All I/O belongs to the caller.

use std::collections::{BTreeMap, BTreeSet};

use vtwatch_core::{MessageRef, NotificationKey, StreamRecord};

/// Ordered output of one reconciliation pass. Deletes are intended to run
/// (and be observed) before any post begins.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPlan {
    /// Keys no longer live, with the message currently representing them.
    pub deletes: Vec<(NotificationKey, MessageRef)>,
    /// Streams with no posted message yet, in input (start-time) order.
    pub posts: Vec<StreamRecord>,
    /// Total currently-live count, used only for the channel-label check.
    pub live_count: usize,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.posts.is_empty()
    }
}

/// Diff the tracked key set against the freshly fetched records.
///
/// A key present on both sides produces no action: key presence, not
/// content, is the freshness signal, so a tracked stream whose content
/// changed is never edited in place.
pub fn reconcile(
    old: &BTreeMap<NotificationKey, MessageRef>,
    new_records: &[StreamRecord],
) -> ReconciliationPlan {
    let new_keys: BTreeSet<NotificationKey> = new_records.iter().map(|r| r.key()).collect();

    let deletes = old
        .iter()
        .filter(|(key, _)| !new_keys.contains(*key))
        .map(|(key, msg)| (key.clone(), *msg))
        .collect();

    let posts = new_records
        .iter()
        .filter(|record| !old.contains_key(&record.key()))
        .cloned()
        .collect();

    ReconciliationPlan {
        deletes,
        posts,
        live_count: new_records.len(),
    }
}
