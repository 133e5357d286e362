use std::sync::PoisonError;
use thiserror::Error;
use crate::database::DatabaseError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Lock error
    #[error("Lock error: {0}")]
    Lock(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violated
    #[error("Already exists: {0}")]
    Duplicate(String),
}

impl<T> From<PoisonError<T>> for RepositoryError {
    fn from(error: PoisonError<T>) -> Self {
        RepositoryError::Lock(error.to_string())
    }
}

impl RepositoryError {
    /// Whether the error comes from the backing store rather than the caller.
    /// Repositories fall back to in-memory storage only for these.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            RepositoryError::Database(_) | RepositoryError::Sqlite(_) | RepositoryError::Pool(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_poisoned_lock_maps_to_lock_error() {
        let mutex = Mutex::new(0);
        let _ = std::panic::catch_unwind(|| {
            let _guard = mutex.lock().unwrap();
            panic!("poison");
        });

        let err: RepositoryError = mutex.lock().unwrap_err().into();
        assert!(matches!(err, RepositoryError::Lock(_)));
        assert!(!err.is_storage_failure());
    }

    #[test]
    fn test_storage_failures_are_classified() {
        let err = RepositoryError::Database(DatabaseError::PoolNotInitialized);
        assert!(err.is_storage_failure());
        assert!(!RepositoryError::NotFound("x".into()).is_storage_failure());
        assert!(!RepositoryError::Duplicate("x".into()).is_storage_failure());
    }
}
