//! In-memory authoritative view of the notification set.
//!
//! The ledger owns deduplication, bounded-history eviction, and read
//! tracking. It holds no I/O: the engine persists a snapshot through the
//! store after every mutating call.

pub mod types;

pub use types::{IngestMode, Notification, NotificationId, WireNotification};

use tracing::debug;

/// Maximum entries retained in append mode. Oldest entries beyond this are
/// evicted silently; there is no archival.
pub const HISTORY_CAP: usize = 50;

/// Ordered notification set, newest first.
#[derive(Debug)]
pub struct Ledger {
    items: Vec<Notification>,
    capacity: usize,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            capacity: HISTORY_CAP,
        }
    }

    /// Rebuild a ledger from a persisted history snapshot.
    ///
    /// Snapshots longer than the cap (written by an older build, or edited
    /// by hand) are truncated on load.
    pub fn from_items(mut items: Vec<Notification>) -> Self {
        items.truncate(HISTORY_CAP);
        Self {
            items,
            capacity: HISTORY_CAP,
        }
    }

    /// Fold a delivery into the ledger.
    ///
    /// Returns the notifications that were not present before this call,
    /// the ones an alert should fire for. Duplicate arrivals are merged per
    /// mode: append ignores them, replace substitutes the whole set.
    pub fn ingest(&mut self, batch: Vec<WireNotification>, mode: IngestMode) -> Vec<Notification> {
        match mode {
            IngestMode::Replace => self.ingest_replace(batch),
            IngestMode::Append => self.ingest_append(batch),
        }
    }

    fn ingest_replace(&mut self, batch: Vec<WireNotification>) -> Vec<Notification> {
        let previous_ids: std::collections::HashSet<NotificationId> =
            self.items.iter().map(|n| n.id.clone()).collect();

        let mut next = Vec::with_capacity(batch.len());
        let mut seen = std::collections::HashSet::new();
        for wire in batch {
            let id = wire.effective_id();
            // Id is unique within the ledger at any instant; a server bug
            // sending the same id twice in one snapshot keeps the first.
            if !seen.insert(id.clone()) {
                debug!(event = "core.ledger.replace_duplicate_dropped", id = %id);
                continue;
            }
            next.push(Notification {
                id,
                title: wire.title,
                content: wire.content,
                task_id: wire.task_id,
                received_at: wire.timestamp.clone(),
                timestamp: wire.timestamp,
                read: false,
            });
        }

        let newly_arrived: Vec<Notification> = next
            .iter()
            .filter(|n| !previous_ids.contains(&n.id))
            .cloned()
            .collect();

        self.items = next;
        newly_arrived
    }

    fn ingest_append(&mut self, batch: Vec<WireNotification>) -> Vec<Notification> {
        let mut newly_arrived = Vec::new();
        for wire in batch {
            let id = wire.effective_id();
            if self.items.iter().any(|n| n.id == id) {
                debug!(event = "core.ledger.append_duplicate_ignored", id = %id);
                continue;
            }
            let notification = Notification {
                id,
                title: wire.title,
                content: wire.content,
                task_id: wire.task_id,
                timestamp: wire.timestamp,
                received_at: chrono::Utc::now().to_rfc3339(),
                read: false,
            };
            self.items.insert(0, notification.clone());
            newly_arrived.push(notification);
        }
        self.items.truncate(self.capacity);
        newly_arrived
    }

    /// Mark a notification read.
    ///
    /// Unknown ids are a silent no-op: absence means the item was already
    /// resolved elsewhere, not a fault. Returns whether anything changed.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        match self.items.iter_mut().find(|n| n.id == *id) {
            Some(n) if !n.read => {
                n.read = true;
                true
            }
            _ => false,
        }
    }

    /// Current ordered sequence, newest first.
    pub fn snapshot(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(id: i64, title: &str) -> WireNotification {
        WireNotification {
            id: Some(NotificationId::Number(id)),
            title: title.to_string(),
            content: format!("content {}", id),
            task_id: Some(id * 10),
            timestamp: format!("2026-03-01T09:00:{:02}Z", id % 60),
        }
    }

    #[test]
    fn test_replace_content_equals_latest_payload() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a"), wire(2, "b")], IngestMode::Replace);
        ledger.ingest(vec![wire(2, "b"), wire(3, "c")], IngestMode::Replace);

        let ids: Vec<_> = ledger.snapshot().iter().map(|n| n.id.clone()).collect();
        assert_eq!(
            ids,
            vec![NotificationId::Number(2), NotificationId::Number(3)]
        );
    }

    #[test]
    fn test_replace_reports_only_new_ids() {
        let mut ledger = Ledger::new();
        let first = ledger.ingest(vec![wire(1, "a"), wire(2, "b")], IngestMode::Replace);
        assert_eq!(first.len(), 2);

        let second = ledger.ingest(vec![wire(2, "b"), wire(3, "c")], IngestMode::Replace);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, NotificationId::Number(3));
    }

    #[test]
    fn test_replace_inherits_received_at_from_source() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a")], IngestMode::Replace);
        let item = &ledger.snapshot()[0];
        assert_eq!(item.received_at, item.timestamp);
    }

    #[test]
    fn test_replace_with_empty_payload_clears_ledger() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a")], IngestMode::Replace);
        let newly = ledger.ingest(vec![], IngestMode::Replace);
        assert!(newly.is_empty());
        assert!(ledger.is_empty());
        assert_eq!(ledger.unread_count(), 0);
    }

    #[test]
    fn test_replace_unread_count_equals_total() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a"), wire(2, "b"), wire(3, "c")], IngestMode::Replace);
        assert_eq!(ledger.unread_count(), ledger.len());
    }

    #[test]
    fn test_append_prepends_newest_first() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a")], IngestMode::Append);
        ledger.ingest(vec![wire(2, "b")], IngestMode::Append);

        let ids: Vec<_> = ledger.snapshot().iter().map(|n| n.id.clone()).collect();
        assert_eq!(
            ids,
            vec![NotificationId::Number(2), NotificationId::Number(1)]
        );
    }

    #[test]
    fn test_append_reingesting_existing_id_is_idempotent() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a"), wire(2, "b")], IngestMode::Append);
        ledger.mark_read(&NotificationId::Number(1));

        let before: Vec<Notification> = ledger.snapshot().to_vec();
        let newly = ledger.ingest(vec![wire(1, "a")], IngestMode::Append);

        assert!(newly.is_empty());
        assert_eq!(ledger.snapshot(), before.as_slice());
        assert!(ledger.snapshot()[1].read);
    }

    #[test]
    fn test_append_stamps_received_at_at_arrival() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a")], IngestMode::Append);
        let item = &ledger.snapshot()[0];
        assert!(!item.received_at.is_empty());
        assert_ne!(item.received_at, item.timestamp);
    }

    #[test]
    fn test_append_evicts_oldest_beyond_cap() {
        let mut ledger = Ledger::new();
        for i in 0..60 {
            ledger.ingest(vec![wire(i, "n")], IngestMode::Append);
        }
        assert_eq!(ledger.len(), HISTORY_CAP);
        // Newest first: 59 at the front, 10 at the back; 0..=9 evicted.
        assert_eq!(ledger.snapshot()[0].id, NotificationId::Number(59));
        assert_eq!(
            ledger.snapshot()[HISTORY_CAP - 1].id,
            NotificationId::Number(10)
        );
    }

    #[test]
    fn test_append_id_falls_back_to_timestamp() {
        let mut ledger = Ledger::new();
        let no_id = WireNotification {
            id: None,
            title: "t".to_string(),
            content: "c".to_string(),
            task_id: None,
            timestamp: "2026-03-01T09:00:00Z".to_string(),
        };
        ledger.ingest(vec![no_id.clone()], IngestMode::Append);
        // Same timestamp, same identity: second arrival is a duplicate.
        let newly = ledger.ingest(vec![no_id], IngestMode::Append);
        assert!(newly.is_empty());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a"), wire(2, "b")], IngestMode::Append);

        assert!(ledger.mark_read(&NotificationId::Number(1)));
        let after_first: Vec<Notification> = ledger.snapshot().to_vec();
        assert_eq!(ledger.unread_count(), 1);

        assert!(!ledger.mark_read(&NotificationId::Number(1)));
        assert_eq!(ledger.snapshot(), after_first.as_slice());
        assert_eq!(ledger.unread_count(), 1);
    }

    #[test]
    fn test_mark_read_unknown_id_is_silent_noop() {
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(1, "a")], IngestMode::Append);
        assert!(!ledger.mark_read(&NotificationId::Number(999)));
        assert_eq!(ledger.unread_count(), 1);
    }

    #[test]
    fn test_cross_mode_dedup_is_independent() {
        // The same id arriving via replace and append applies each mode's
        // own rule: replace substitutes, append then sees it as present.
        let mut ledger = Ledger::new();
        ledger.ingest(vec![wire(7, "poll")], IngestMode::Replace);
        let newly = ledger.ingest(vec![wire(7, "push")], IngestMode::Append);
        assert!(newly.is_empty());
        assert_eq!(ledger.len(), 1);

        // And a later replace snapshot without it drops it again.
        let newly = ledger.ingest(vec![wire(8, "poll")], IngestMode::Replace);
        assert_eq!(newly.len(), 1);
        assert_eq!(ledger.snapshot()[0].id, NotificationId::Number(8));
    }

    #[test]
    fn test_from_items_truncates_oversized_snapshot() {
        let mut items = Vec::new();
        for i in 0..80 {
            items.push(Notification {
                id: NotificationId::Number(i),
                title: "t".to_string(),
                content: "c".to_string(),
                task_id: None,
                timestamp: String::new(),
                received_at: String::new(),
                read: false,
            });
        }
        let ledger = Ledger::from_items(items);
        assert_eq!(ledger.len(), HISTORY_CAP);
        assert_eq!(ledger.snapshot()[0].id, NotificationId::Number(0));
    }
}
