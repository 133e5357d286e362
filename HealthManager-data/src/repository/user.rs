use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::database::{get_db_pool, DatabaseError, DatabasePool};
use crate::models::{NewUser, UserRecord};
use super::errors::RepositoryError;
use super::in_memory::InMemoryStorage;
use super::storage::DatabaseStorage;

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Create an account; fails with `Duplicate` when the email is taken
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Persist changes to an existing account
    async fn update(&self, user: UserRecord) -> Result<UserRecord, RepositoryError>;
}

/// Repository for user accounts, database first with in-memory fallback
#[derive(Debug, Clone, Default)]
pub struct UserRepository {
    storage: InMemoryStorage,
    pool: Option<DatabasePool>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

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

    async fn save(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
        match self.db_pool() {
            Ok(pool) => match DatabaseStorage::store_user(&pool, &user).await {
                Ok(_) => Ok(user),
                Err(e) if e.is_storage_failure() => {
                    error!("Failed to store user in database: {}", e);
                    self.storage.store_user(&user).await
                }
                Err(e) => Err(e),
            },
            Err(e) => {
                debug!("Database not available ({}), using in-memory storage for users", e);
                self.storage.store_user(&user).await
            }
        }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, new_user: NewUser) -> Result<UserRecord, RepositoryError> {
        if self.get_by_email(&new_user.email).await?.is_some() {
            return Err(RepositoryError::Duplicate(format!("email {}", new_user.email)));
        }

        let now = Utc::now().to_rfc3339();
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            roles: new_user.roles,
            birth_date: None,
            gender: None,
            height_cm: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.save(user).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        let id = id.to_string();
        match self.db_pool() {
            Ok(pool) => match DatabaseStorage::get_user(&pool, &id).await {
                Ok(Some(user)) => Ok(Some(user)),
                Ok(None) => self.storage.get_user(&id).await,
                Err(e) => {
                    error!("Failed to get user from database: {}", e);
                    self.storage.get_user(&id).await
                }
            },
            Err(_) => self.storage.get_user(&id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        match self.db_pool() {
            Ok(pool) => match DatabaseStorage::get_user_by_email(&pool, email).await {
                Ok(Some(user)) => Ok(Some(user)),
                Ok(None) => self.storage.get_user_by_email(email).await,
                Err(e) => {
                    error!("Failed to get user by email from database: {}", e);
                    self.storage.get_user_by_email(email).await
                }
            },
            Err(_) => self.storage.get_user_by_email(email).await,
        }
    }

    async fn update(&self, mut user: UserRecord) -> Result<UserRecord, RepositoryError> {
        let id = Uuid::parse_str(&user.id)
            .map_err(|_| RepositoryError::Validation(format!("Invalid user ID: {}", user.id)))?;
        if self.get_by_id(id).await?.is_none() {
            return Err(RepositoryError::NotFound(format!("user {}", user.id)));
        }
        user.updated_at = Utc::now().to_rfc3339();
        self.save(user).await
    }
}

/// Mock user repository for testing
#[cfg(any(test, feature = "mock"))]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock implementation of UserRepository keyed by ID
    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<HashMap<String, UserRecord>>,
    }

    impl MockUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_users(users: Vec<UserRecord>) -> Self {
            Self {
                users: Mutex::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
            }
        }
    }

    #[async_trait]
    impl UserRepositoryTrait for MockUserRepository {
        async fn create(&self, new_user: NewUser) -> Result<UserRecord, RepositoryError> {
            let mut users = self.users.lock()?;
            if users.values().any(|u| u.email == new_user.email) {
                return Err(RepositoryError::Duplicate(format!("email {}", new_user.email)));
            }
            let now = Utc::now().to_rfc3339();
            let user = UserRecord {
                id: Uuid::new_v4().to_string(),
                email: new_user.email,
                password_hash: new_user.password_hash,
                name: new_user.name,
                roles: new_user.roles,
                birth_date: None,
                gender: None,
                height_cm: None,
                created_at: now.clone(),
                updated_at: now,
            };
            users.insert(user.id.clone(), user.clone());
            Ok(user)
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
            Ok(self.users.lock()?.get(&id.to_string()).cloned())
        }

        async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
            Ok(self.users.lock()?.values().find(|u| u.email == email).cloned())
        }

        async fn update(&self, user: UserRecord) -> Result<UserRecord, RepositoryError> {
            let mut users = self.users.lock()?;
            if !users.contains_key(&user.id) {
                return Err(RepositoryError::NotFound(format!("user {}", user.id)));
            }
            users.insert(user.id.clone(), user.clone());
            Ok(user)
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::database::{create_pool, DatabaseConfig, DatabaseType};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            name: "Test User".to_string(),
            roles: vec!["user".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_update_user_in_sqlite() {
        let pool = create_pool(&DatabaseConfig {
            db_type: DatabaseType::Memory,
            sqlite_path: None,
            ..DatabaseConfig::default()
        })
        .unwrap();
        let repo = UserRepository::with_pool(pool);

        let user = repo.create(new_user("jane@example.com")).await.unwrap();
        let duplicate = repo.create(new_user("jane@example.com")).await.unwrap_err();
        assert!(matches!(duplicate, RepositoryError::Duplicate(_)));

        let mut changed = user.clone();
        changed.height_cm = Some(168.0);
        changed.gender = Some("female".to_string());
        let updated = repo.update(changed).await.unwrap();
        assert_eq!(updated.height_cm, Some(168.0));

        let by_email = repo.get_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.gender.as_deref(), Some("female"));
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let repo = tests::MockUserRepository::new();
        let user = repo.create(new_user("a@example.com")).await.unwrap();
        let ghost = UserRecord { id: Uuid::new_v4().to_string(), ..user };
        assert!(matches!(repo.update(ghost).await, Err(RepositoryError::NotFound(_))));
    }
}
