//! Transactional Key-Value Engine
//!
//! Wraps a single redb file holding two tables:
//! - **`default`**: the primary data served by `/get`.
//! - **`replica`**: the outbox of writes not yet acknowledged by the replica.
//!
//! Every `set` writes both tables in one write transaction, so a crash can never
//! leave a primary value without its outbox entry (or the other way round).

use super::errors::StorageError;

use redb::{ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

type BytesTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

const PRIMARY_TABLE: BytesTable = TableDefinition::new("default");
const OUTBOX_TABLE: BytesTable = TableDefinition::new("replica");

/// A pending replication entry taken from the outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Node-local storage engine.
///
/// redb serializes write transactions internally and gives readers a
/// consistent snapshot, so the handle can be shared behind an `Arc`.
pub struct Database {
    db: redb::Database,
    read_only: bool,
}

impl Database {
    /// Opens (or creates) the database file and makes sure both tables exist.
    ///
    /// With `read_only` set, `set` is rejected; `set_local` still works so the
    /// replication loop can apply entries on a replica.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self, StorageError> {
        let db = redb::Database::create(path.as_ref())?;

        let txn = db.begin_write()?;
        {
            txn.open_table(PRIMARY_TABLE)?;
            txn.open_table(OUTBOX_TABLE)?;
        }
        txn.commit()?;

        tracing::debug!(
            "Opened database at {} (read_only={})",
            path.as_ref().display(),
            read_only
        );

        Ok(Self { db, read_only })
    }

    /// Reads the current primary value. A missing key is `Ok(None)`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PRIMARY_TABLE)?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    /// Writes `key -> value` into the primary table and the outbox atomically.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }

        let txn = self.db.begin_write()?;
        {
            let mut primary = txn.open_table(PRIMARY_TABLE)?;
            primary.insert(key, value)?;

            let mut outbox = txn.open_table(OUTBOX_TABLE)?;
            outbox.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Writes only the primary table. Used by replicas to apply leader writes
    /// without queueing them for further replication.
    pub fn set_local(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write()?;
        {
            let mut primary = txn.open_table(PRIMARY_TABLE)?;
            primary.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Deletes every primary key matching `is_extra`, returning how many were removed.
    ///
    /// The predicate runs against a read snapshot first; the collected keys are
    /// then deleted in one write transaction. Keys written in between are left alone.
    /// Pending outbox entries for purged keys are dropped in the same transaction.
    pub fn purge_where<F>(&self, is_extra: F) -> Result<usize, StorageError>
    where
        F: Fn(&[u8]) -> bool,
    {
        let mut extra_keys: Vec<Vec<u8>> = Vec::new();
        {
            let txn = self.db.begin_read()?;
            let table = txn.open_table(PRIMARY_TABLE)?;
            for entry in table.iter()? {
                let (key, _) = entry?;
                if is_extra(key.value()) {
                    extra_keys.push(key.value().to_vec());
                }
            }
        }

        if extra_keys.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin_write()?;
        {
            let mut primary = txn.open_table(PRIMARY_TABLE)?;
            let mut outbox = txn.open_table(OUTBOX_TABLE)?;
            for key in &extra_keys {
                primary.remove(key.as_slice())?;
                outbox.remove(key.as_slice())?;
            }
        }
        txn.commit()?;

        Ok(extra_keys.len())
    }

    /// Returns the outbox entry with the lexicographically smallest key.
    ///
    /// There is no write timestamp, so this is key order and not write order.
    pub fn oldest_outbox_entry(&self) -> Result<Option<OutboxEntry>, StorageError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(OUTBOX_TABLE)?;
        let entry = table.first()?.map(|(key, value)| OutboxEntry {
            key: key.value().to_vec(),
            value: value.value().to_vec(),
        });
        Ok(entry)
    }

    /// Compare-and-delete on the outbox.
    ///
    /// Removes the entry only when it still holds exactly `value`; a newer write
    /// for the same key keeps its replication obligation.
    pub fn ack_outbox_entry(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(OUTBOX_TABLE)?;
            let matches = match table.get(key)? {
                None => return Err(StorageError::NotFound),
                Some(current) => current.value() == value,
            };
            if !matches {
                return Err(StorageError::ValueMismatch);
            }
            table.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Number of keys in the primary table.
    pub fn primary_len(&self) -> Result<usize, StorageError> {
        self.count(PRIMARY_TABLE)
    }

    /// Number of writes waiting in the outbox.
    pub fn outbox_len(&self) -> Result<usize, StorageError> {
        self.count(OUTBOX_TABLE)
    }

    fn count(&self, definition: BytesTable) -> Result<usize, StorageError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(definition)?;
        Ok(table.len()? as usize)
    }
}
