//! Storage Module Tests
//!
//! Exercises the redb-backed engine against scratch files.
//!
//! ## Test Scopes
//! - **Read/Write**: `get`, `set`, `set_local` and read-only enforcement.
//! - **Outbox**: dual-write invariant, key-ordered polling, compare-and-delete.
//! - **Purge**: predicate-driven removal of primary keys.

#[cfg(test)]
mod tests {
    use crate::storage::{Database, OutboxEntry, StorageError};
    use tempfile::TempDir;

    fn open_temp_db(read_only: bool) -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::open(dir.path().join("shard.redb"), read_only)
            .expect("Failed to open database");
        (dir, db)
    }

    fn entry(key: &str, value: &str) -> OutboxEntry {
        OutboxEntry {
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        }
    }

    // ============================================================
    // GET / SET TESTS
    // ============================================================

    #[test]
    fn test_set_then_get() {
        let (_dir, db) = open_temp_db(false);

        db.set(b"hello", b"world").unwrap();

        assert_eq!(db.get(b"hello").unwrap(), Some(b"world".to_vec()));
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let (_dir, db) = open_temp_db(false);

        assert_eq!(db.get(b"missing").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites_value() {
        let (_dir, db) = open_temp_db(false);

        db.set(b"fruit", b"apple").unwrap();
        db.set(b"fruit", b"banana").unwrap();

        assert_eq!(db.get(b"fruit").unwrap(), Some(b"banana".to_vec()));
    }

    #[test]
    fn test_set_on_read_only_fails_and_leaves_state() {
        let (_dir, db) = open_temp_db(true);

        let err = db.set(b"foo", b"bar").unwrap_err();

        assert!(matches!(err, StorageError::ReadOnly));
        assert_eq!(db.get(b"foo").unwrap(), None);
        assert_eq!(db.outbox_len().unwrap(), 0);
    }

    #[test]
    fn test_set_local_allowed_on_read_only() {
        let (_dir, db) = open_temp_db(true);

        db.set_local(b"foo", b"bar").unwrap();

        assert_eq!(db.get(b"foo").unwrap(), Some(b"bar".to_vec()));
    }

    #[test]
    fn test_set_local_skips_outbox() {
        let (_dir, db) = open_temp_db(false);

        db.set_local(b"foo", b"bar").unwrap();

        assert_eq!(db.oldest_outbox_entry().unwrap(), None);
        assert_eq!(db.outbox_len().unwrap(), 0);
    }

    #[test]
    fn test_set_local_twice_is_idempotent() {
        let (_dir, db) = open_temp_db(true);

        db.set_local(b"x", b"1").unwrap();
        let once = (db.get(b"x").unwrap(), db.primary_len().unwrap());

        db.set_local(b"x", b"1").unwrap();
        let twice = (db.get(b"x").unwrap(), db.primary_len().unwrap());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shard.redb");

        {
            let db = Database::open(&path, false).unwrap();
            db.set(b"durable", b"yes").unwrap();
        }

        let db = Database::open(&path, false).unwrap();
        assert_eq!(db.get(b"durable").unwrap(), Some(b"yes".to_vec()));
        assert_eq!(db.oldest_outbox_entry().unwrap(), Some(entry("durable", "yes")));
    }

    // ============================================================
    // OUTBOX TESTS
    // ============================================================

    #[test]
    fn test_set_writes_primary_and_outbox() {
        let (_dir, db) = open_temp_db(false);

        db.set(b"k", b"v").unwrap();

        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(db.oldest_outbox_entry().unwrap(), Some(entry("k", "v")));
    }

    #[test]
    fn test_outbox_keeps_only_latest_value() {
        let (_dir, db) = open_temp_db(false);

        db.set(b"k", b"v1").unwrap();
        db.set(b"k", b"v2").unwrap();

        assert_eq!(db.outbox_len().unwrap(), 1);
        assert_eq!(db.oldest_outbox_entry().unwrap(), Some(entry("k", "v2")));
    }

    #[test]
    fn test_oldest_entry_is_smallest_key_not_first_written() {
        let (_dir, db) = open_temp_db(false);

        db.set(b"zebra", b"1").unwrap();
        db.set(b"apple", b"2").unwrap();
        db.set(b"mango", b"3").unwrap();

        assert_eq!(db.oldest_outbox_entry().unwrap(), Some(entry("apple", "2")));
    }

    #[test]
    fn test_oldest_entry_empty_outbox() {
        let (_dir, db) = open_temp_db(false);

        assert_eq!(db.oldest_outbox_entry().unwrap(), None);
    }

    #[test]
    fn test_ack_removes_matching_entry() {
        let (_dir, db) = open_temp_db(false);
        db.set(b"hello", b"world").unwrap();

        db.ack_outbox_entry(b"hello", b"world").unwrap();

        assert_eq!(db.oldest_outbox_entry().unwrap(), None);
        // Primary data is untouched by acknowledgment.
        assert_eq!(db.get(b"hello").unwrap(), Some(b"world".to_vec()));
    }

    #[test]
    fn test_ack_value_mismatch_keeps_entry() {
        let (_dir, db) = open_temp_db(false);
        db.set(b"hello", b"world").unwrap();

        let err = db.ack_outbox_entry(b"hello", b"foo").unwrap_err();

        assert!(matches!(err, StorageError::ValueMismatch));
        assert_eq!(db.oldest_outbox_entry().unwrap(), Some(entry("hello", "world")));
    }

    #[test]
    fn test_ack_missing_key_not_found() {
        let (_dir, db) = open_temp_db(false);

        let err = db.ack_outbox_entry(b"ghost", b"value").unwrap_err();

        assert!(matches!(err, StorageError::NotFound));
    }

    #[test]
    fn test_ack_after_newer_write_is_rejected() {
        let (_dir, db) = open_temp_db(false);
        db.set(b"k", b"old").unwrap();
        let polled = db.oldest_outbox_entry().unwrap().unwrap();

        // A newer write lands before the replica acknowledges.
        db.set(b"k", b"new").unwrap();

        let err = db.ack_outbox_entry(&polled.key, &polled.value).unwrap_err();
        assert!(matches!(err, StorageError::ValueMismatch));
        assert_eq!(db.oldest_outbox_entry().unwrap(), Some(entry("k", "new")));
    }

    #[test]
    fn test_ack_twice_second_is_not_found() {
        let (_dir, db) = open_temp_db(false);
        db.set(b"k", b"v").unwrap();

        db.ack_outbox_entry(b"k", b"v").unwrap();
        let err = db.ack_outbox_entry(b"k", b"v").unwrap_err();

        assert!(matches!(err, StorageError::NotFound));
    }

    // ============================================================
    // PURGE TESTS
    // ============================================================

    #[test]
    fn test_purge_where_removes_only_matching_keys() {
        let (_dir, db) = open_temp_db(false);
        db.set(b"hello", b"world").unwrap();
        db.set(b"merry", b"christmas").unwrap();

        let purged = db.purge_where(|key| key == b"merry").unwrap();

        assert_eq!(purged, 1);
        assert_eq!(db.get(b"hello").unwrap(), Some(b"world".to_vec()));
        assert_eq!(db.get(b"merry").unwrap(), None);
    }

    #[test]
    fn test_purge_where_nothing_matches() {
        let (_dir, db) = open_temp_db(false);
        db.set(b"a", b"1").unwrap();
        db.set(b"b", b"2").unwrap();

        let purged = db.purge_where(|_| false).unwrap();

        assert_eq!(purged, 0);
        assert_eq!(db.primary_len().unwrap(), 2);
    }

    #[test]
    fn test_purge_where_many_keys() {
        let (_dir, db) = open_temp_db(false);
        for i in 0..200 {
            let key = format!("key-{:03}", i);
            db.set(key.as_bytes(), b"v").unwrap();
        }

        // Drop every even-numbered key.
        let purged = db
            .purge_where(|key| {
                let text = std::str::from_utf8(key).unwrap();
                let n: u32 = text.trim_start_matches("key-").parse().unwrap();
                n % 2 == 0
            })
            .unwrap();

        assert_eq!(purged, 100);
        assert_eq!(db.primary_len().unwrap(), 100);
        assert_eq!(db.get(b"key-000").unwrap(), None);
        assert_eq!(db.get(b"key-001").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_purge_drops_pending_outbox_entries_of_purged_keys() {
        let (_dir, db) = open_temp_db(false);
        db.set(b"gone", b"v").unwrap();
        db.set(b"kept", b"v").unwrap();

        db.purge_where(|key| key == b"gone").unwrap();

        assert_eq!(db.get(b"gone").unwrap(), None);
        assert_eq!(db.outbox_len().unwrap(), 1);
        assert_eq!(db.oldest_outbox_entry().unwrap(), Some(entry("kept", "v")));
    }
}
