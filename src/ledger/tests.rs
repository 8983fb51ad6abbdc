//! Ledger Module Tests
//!
//! ## Test Scopes
//! - **Filtering**: Order preservation and exclusion of seen ids.
//! - **Idempotence**: Repeated `mark_seen` calls.
//! - **Durability**: Restart survival and behavior when the disk write fails.

#[cfg(test)]
mod tests {
    use crate::error::SyncError;
    use crate::feed::CandidateItem;
    use crate::ledger::IdempotencyLedger;
    use crate::persistence::{FilePersistence, MemoryPersistence, PROCESSED_IDS_KEY};
    use std::sync::Arc;

    fn items(ids: &[&str]) -> Vec<CandidateItem> {
        ids.iter().map(|id| CandidateItem::new(*id)).collect()
    }

    fn ids(items: &[CandidateItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn test_filter_preserves_order_and_drops_seen() {
        let ledger = IdempotencyLedger::load(Arc::new(MemoryPersistence::new()));
        ledger.mark_seen("item-2").unwrap();

        let unseen = ledger.filter_unseen(items(&["item-1", "item-2", "item-3"]));

        assert_eq!(ids(&unseen), vec!["item-1", "item-3"]);
    }

    #[test]
    fn test_mark_seen_is_idempotent() {
        let persistence = Arc::new(MemoryPersistence::new());
        let ledger = IdempotencyLedger::load(persistence.clone());

        assert!(ledger.mark_seen("a").unwrap());
        assert!(!ledger.mark_seen("a").unwrap());
        assert!(!ledger.mark_seen("a").unwrap());

        assert_eq!(ledger.len(), 1);
        // Only the first call wrote anything
        assert_eq!(persistence.write_count(), 1);
    }

    #[test]
    fn test_seen_ids_never_come_back_for_any_call_order() {
        let ledger = IdempotencyLedger::load(Arc::new(MemoryPersistence::new()));
        let sequence = ["c", "a", "c", "e", "a", "a", "b"];
        let all = items(&["a", "b", "c", "d", "e", "f"]);

        for (step, id) in sequence.iter().enumerate() {
            ledger.mark_seen(id).unwrap();

            let unseen = ledger.filter_unseen(all.clone());
            for marked in &sequence[..=step] {
                assert!(
                    !unseen.iter().any(|item| item.id == *marked),
                    "{} was marked but returned after step {}",
                    marked,
                    step
                );
            }
        }

        assert_eq!(ids(&ledger.filter_unseen(all)), vec!["d", "f"]);
    }

    #[test]
    fn test_ledger_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        {
            let persistence = Arc::new(FilePersistence::new(dir.path()).unwrap());
            let ledger = IdempotencyLedger::load(persistence);
            ledger.mark_seen("posted-1").unwrap();
            ledger.mark_seen("posted-2").unwrap();
        }

        let persistence = Arc::new(FilePersistence::new(dir.path()).unwrap());
        let ledger = IdempotencyLedger::load(persistence);

        assert!(ledger.contains("posted-1"));
        assert!(ledger.contains("posted-2"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_persistence_failure_still_updates_memory() {
        // ARRANGE
        let persistence = Arc::new(MemoryPersistence::new());
        let ledger = IdempotencyLedger::load(persistence.clone());
        persistence.set_fail_writes(true);

        // ACT
        let result = ledger.mark_seen("x");

        // ASSERT: reported, but the process still treats "x" as handled
        assert!(matches!(result, Err(SyncError::PersistenceFailure(_))));
        assert!(ledger.contains("x"));
        assert!(ledger.filter_unseen(items(&["x"])).is_empty());
        assert!(ledger.is_dirty());

        // Durability comes back with a flush once the disk recovers
        persistence.set_fail_writes(false);
        ledger.flush().unwrap();
        assert!(!ledger.is_dirty());
        assert!(persistence.stored_set(PROCESSED_IDS_KEY).contains("x"));
    }

    #[test]
    fn test_corrupt_ledger_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("processed_ids.json"), "{{{").unwrap();
        let persistence = Arc::new(FilePersistence::new(dir.path()).unwrap());

        let ledger = IdempotencyLedger::load(persistence);

        assert!(ledger.is_empty());
        assert!(ledger.mark_seen("fresh").unwrap());
    }
}
