use thiserror::Error;

/// Errors raised by the storage engine.
///
/// `ReadOnly`, `NotFound` and `ValueMismatch` are protocol outcomes; the
/// remaining variants wrap failures of the underlying redb file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write was attempted through `set` on a replica database.
    #[error("read-only mode")]
    ReadOnly,

    /// Outbox acknowledgment for a key that is not queued.
    #[error("key does not exist")]
    NotFound,

    /// Outbox acknowledgment whose value no longer matches the queued one.
    #[error("value does not match")]
    ValueMismatch,

    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(Box::new(err))
    }
}

impl StorageError {
    /// True when the database file itself is damaged and retrying is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StorageError::Storage(redb::StorageError::Corrupted(_))
                | StorageError::Database(redb::DatabaseError::Storage(
                    redb::StorageError::Corrupted(_)
                ))
        )
    }
}
