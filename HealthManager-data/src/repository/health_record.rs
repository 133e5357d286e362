use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::database::{get_db_pool, DatabaseError, DatabasePool};
use crate::models::{HealthRecord, HealthRecordFilter, NewHealthRecord};
use super::errors::RepositoryError;
use super::in_memory::InMemoryStorage;
use super::storage::DatabaseStorage;

/// Repository trait for health records
#[async_trait]
pub trait HealthRecordRepositoryTrait: Send + Sync {
    /// Store a new record and return it with its generated ID
    async fn create(&self, record: NewHealthRecord) -> Result<HealthRecord, RepositoryError>;

    /// Get a record by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<HealthRecord>, RepositoryError>;

    /// Delete a record by ID, returning whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Get a page of a user's records and the total matching count
    async fn get_filtered(&self, filter: HealthRecordFilter) -> Result<(Vec<HealthRecord>, usize), RepositoryError>;
}

/// Repository for health records.
/// Uses the SQLite pool when available and falls back to in-memory storage.
#[derive(Debug, Clone, Default)]
pub struct HealthRecordRepository {
    /// In-memory storage for when database is not available
    storage: InMemoryStorage,
    /// Explicit pool; the global pool is used when unset
    pool: Option<DatabasePool>,
}

impl HealthRecordRepository {
    /// Create a repository backed by the global pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository backed by a specific pool
    pub fn with_pool(pool: DatabasePool) -> Self {
        Self {
            storage: InMemoryStorage::new(),
            pool: Some(pool),
        }
    }

    fn db_pool(&self) -> Result<DatabasePool, DatabaseError> {
        match &self.pool {
            Some(pool) => Ok(pool.clone()),
            None => get_db_pool(),
        }
    }
}

#[async_trait]
impl HealthRecordRepositoryTrait for HealthRecordRepository {
    async fn create(&self, new_record: NewHealthRecord) -> Result<HealthRecord, RepositoryError> {
        let record = HealthRecord {
            id: Uuid::new_v4().to_string(),
            user_id: new_record.user_id,
            metric_type: new_record.metric_type,
            value: new_record.value,
            secondary_value: new_record.secondary_value,
            unit: new_record.unit,
            timestamp: new_record.timestamp,
            notes: new_record.notes,
            created_at: Utc::now().to_rfc3339(),
        };

        match self.db_pool() {
            Ok(pool) => {
                debug!("Storing health record in database: {}", record.id);
                match DatabaseStorage::store_record(&pool, &record).await {
                    Ok(_) => Ok(record),
                    Err(e) if e.is_storage_failure() => {
                        error!("Failed to store record in database: {}", e);
                        self.storage.store_record(&record).await
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => {
                debug!("Database not available ({}), using in-memory storage", e);
                self.storage.store_record(&record).await
            }
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<HealthRecord>, RepositoryError> {
        let id = id.to_string();
        match self.db_pool() {
            Ok(pool) => match DatabaseStorage::get_record(&pool, &id).await {
                Ok(Some(record)) => Ok(Some(record)),
                // Records written during an outage live in memory
                Ok(None) => self.storage.get_record(&id).await,
                Err(e) => {
                    error!("Failed to get record by ID from database: {}", e);
                    self.storage.get_record(&id).await
                }
            },
            Err(e) => {
                debug!("Database not available ({}), using in-memory storage for get_by_id", e);
                self.storage.get_record(&id).await
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let id = id.to_string();
        let in_memory = self.storage.delete_record(&id).await?;
        match self.db_pool() {
            Ok(pool) => match DatabaseStorage::delete_record(&pool, &id).await {
                Ok(deleted) => Ok(deleted || in_memory),
                Err(e) => {
                    error!("Failed to delete record from database: {}", e);
                    Ok(in_memory)
                }
            },
            Err(e) => {
                debug!("Database not available ({}), deleted from in-memory storage only", e);
                Ok(in_memory)
            }
        }
    }

    async fn get_filtered(&self, filter: HealthRecordFilter) -> Result<(Vec<HealthRecord>, usize), RepositoryError> {
        match self.db_pool() {
            Ok(pool) => {
                debug!("Getting filtered health records from database");
                match DatabaseStorage::get_filtered_records(&pool, &filter).await {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        error!("Failed to get filtered records from database: {}", e);
                        self.storage.get_filtered_records(&filter).await
                    }
                }
            }
            Err(e) => {
                debug!("Database not available ({}), using in-memory storage for get_filtered", e);
                self.storage.get_filtered_records(&filter).await
            }
        }
    }
}

/// Mock health record repository for testing
#[cfg(any(test, feature = "mock"))]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock implementation of HealthRecordRepository for testing
    #[derive(Default)]
    pub struct MockHealthRecordRepository {
        records: Mutex<Vec<HealthRecord>>,
        fail: bool,
    }

    impl MockHealthRecordRepository {
        /// Create a new empty mock repository
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a mock repository with predefined records
        pub fn with_records(records: Vec<HealthRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                fail: false,
            }
        }

        /// Every call fails with a database error
        pub fn failing() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn check(&self) -> Result<(), RepositoryError> {
            if self.fail {
                Err(RepositoryError::Database(DatabaseError::GenericError(
                    "mock repository configured to fail".to_string(),
                )))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl HealthRecordRepositoryTrait for MockHealthRecordRepository {
        async fn create(&self, new_record: NewHealthRecord) -> Result<HealthRecord, RepositoryError> {
            self.check()?;
            let record = HealthRecord {
                id: Uuid::new_v4().to_string(),
                user_id: new_record.user_id,
                metric_type: new_record.metric_type,
                value: new_record.value,
                secondary_value: new_record.secondary_value,
                unit: new_record.unit,
                timestamp: new_record.timestamp,
                notes: new_record.notes,
                created_at: Utc::now().to_rfc3339(),
            };
            self.records.lock()?.push(record.clone());
            Ok(record)
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Option<HealthRecord>, RepositoryError> {
            self.check()?;
            let id = id.to_string();
            Ok(self.records.lock()?.iter().find(|r| r.id == id).cloned())
        }

        async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
            self.check()?;
            let id = id.to_string();
            let mut records = self.records.lock()?;
            let before = records.len();
            records.retain(|r| r.id != id);
            Ok(records.len() < before)
        }

        async fn get_filtered(&self, filter: HealthRecordFilter) -> Result<(Vec<HealthRecord>, usize), RepositoryError> {
            self.check()?;
            let sort_desc = filter.sort_desc.unwrap_or(true);
            let mut filtered: Vec<HealthRecord> = self
                .records
                .lock()?
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect();

            filtered.sort_by(|a, b| {
                let cmp = a.timestamp.cmp(&b.timestamp);
                if sort_desc { cmp.reverse() } else { cmp }
            });

            let total = filtered.len();
            let paged = filtered
                .into_iter()
                .skip(filter.offset.unwrap_or(0))
                .take(filter.limit.unwrap_or(usize::MAX))
                .collect();

            Ok((paged, total))
        }
    }
}
