//! Persistence Module Tests
//!
//! Verifies that the file-backed store survives a "restart" (a fresh instance over the same
//! directory) and that the in-memory double honours its failure switch.

#[cfg(test)]
mod tests {
    use crate::persistence::{
        FilePersistence, LAST_VERSION_KEY, LocalPersistence, MemoryPersistence,
        PROCESSED_IDS_KEY,
    };
    use std::collections::HashSet;

    #[test]
    fn test_file_persistence_missing_keys_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path()).unwrap();

        assert!(persistence.load_string_set(PROCESSED_IDS_KEY).unwrap().is_empty());
        assert!(persistence.load_token(LAST_VERSION_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        // ARRANGE: first "process" writes state
        {
            let persistence = FilePersistence::new(dir.path()).unwrap();
            let ids: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
            persistence.save_string_set(PROCESSED_IDS_KEY, &ids).unwrap();
            persistence.save_token(LAST_VERSION_KEY, "etag-42").unwrap();
        }

        // ACT: second "process" reads it back
        let persistence = FilePersistence::new(dir.path()).unwrap();
        let ids = persistence.load_string_set(PROCESSED_IDS_KEY).unwrap();
        let token = persistence.load_token(LAST_VERSION_KEY).unwrap();

        // ASSERT
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("b"));
        assert_eq!(token.as_deref(), Some("etag-42"));
        // No temp files left behind
        assert!(!dir.path().join("processed_ids.json.tmp").exists());
    }

    #[test]
    fn test_file_persistence_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("processed_ids.json"), "not json").unwrap();
        let persistence = FilePersistence::new(dir.path()).unwrap();

        assert!(persistence.load_string_set(PROCESSED_IDS_KEY).is_err());
    }

    #[test]
    fn test_memory_persistence_failure_switch() {
        let persistence = MemoryPersistence::new();
        let ids: HashSet<String> = ["x".to_string()].into_iter().collect();

        persistence.set_fail_writes(true);
        assert!(persistence.save_string_set(PROCESSED_IDS_KEY, &ids).is_err());
        assert!(persistence.stored_set(PROCESSED_IDS_KEY).is_empty());

        persistence.set_fail_writes(false);
        assert!(persistence.save_string_set(PROCESSED_IDS_KEY, &ids).is_ok());
        assert_eq!(persistence.write_count(), 1);
    }
}
