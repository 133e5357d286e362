use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};
use validator::Validate;

use health_manager_data::models::{NewUser, UserRecord};
use health_manager_data::repository::{RepositoryError, UserRepository, UserRepositoryTrait};

use crate::auth::password::{hash_password, verify_password};
use crate::entities::conversions;
use crate::entities::user::{RegisterRequest, UpdateProfileRequest, User, ROLE_ADMIN, ROLE_USER};
use crate::errors::{AppError, AuthError, ValidationError};
use crate::services::metrics::{MetricsServiceTrait, LOGINS_FAILED, LOGINS_SUCCEEDED, USERS_REGISTERED};
use crate::services::validation_message;

/// Trait for account operations
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    /// Create an account
    async fn register(&self, request: RegisterRequest) -> Result<User, AppError>;

    /// Check credentials. Unknown email and wrong password fail the same way.
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<User, AppError>;

    async fn update_profile(&self, id: &str, request: UpdateProfileRequest) -> Result<User, AppError>;
}

/// Emails granted the admin role at registration, from `ADMIN_EMAILS`
pub fn admin_emails_from_env() -> Vec<String> {
    std::env::var("ADMIN_EMAILS")
        .map(|raw| parse_email_list(&raw))
        .unwrap_or_default()
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// User service backed by a user repository
pub struct UserService<R: UserRepositoryTrait> {
    repository: R,
    metrics: Arc<dyn MetricsServiceTrait>,
    admin_emails: Vec<String>,
}

impl<R: UserRepositoryTrait> UserService<R> {
    pub fn new(repository: R, metrics: Arc<dyn MetricsServiceTrait>, admin_emails: Vec<String>) -> Self {
        Self {
            repository,
            metrics,
            admin_emails,
        }
    }

    fn map_repo_error(&self, err: RepositoryError) -> AppError {
        match err {
            RepositoryError::Duplicate(_) => AppError::Conflict("Email is already registered".to_string()),
            other => {
                error!("User repository error: {}", other);
                AppError::from(other)
            }
        }
    }

    async fn load(&self, id: &str) -> Result<UserRecord, AppError> {
        let not_found = || AppError::NotFound(format!("User {}", id));
        let uuid = conversions::parse_string_to_uuid(id).map_err(|_| not_found())?;
        self.repository
            .get_by_id(uuid)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(not_found)
    }
}

#[async_trait]
impl<R: UserRepositoryTrait> UserServiceTrait for UserService<R> {
    async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        if let Err(errors) = request.validate() {
            return Err(AppError::Validation(validation_message(&errors)));
        }

        let email = request.email.trim().to_lowercase();
        let mut roles = vec![ROLE_USER.to_string()];
        if self.admin_emails.contains(&email) {
            info!("Granting admin role to {}", email);
            roles.push(ROLE_ADMIN.to_string());
        }

        let password_hash = hash_password(&request.password).map_err(|e| AppError::Internal(e.to_string()))?;
        let record = self
            .repository
            .create(NewUser {
                email,
                password_hash,
                name: request.name.trim().to_string(),
                roles,
            })
            .await
            .map_err(|e| self.map_repo_error(e))?;

        info!("Registered user {}", record.id);
        self.metrics.increment(USERS_REGISTERED);
        conversions::convert_to_domain_user(record).map_err(AppError::Internal)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = email.trim().to_lowercase();
        let record = self
            .repository
            .get_by_email(&email)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        match record {
            Some(record) if verify_password(password, &record.password_hash) => {
                self.metrics.increment(LOGINS_SUCCEEDED);
                conversions::convert_to_domain_user(record).map_err(AppError::Internal)
            }
            _ => {
                warn!("Failed authentication attempt for {}", email);
                self.metrics.increment(LOGINS_FAILED);
                Err(AppError::Auth(AuthError::InvalidCredentials))
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<User, AppError> {
        let record = self.load(id).await?;
        conversions::convert_to_domain_user(record).map_err(AppError::Internal)
    }

    async fn update_profile(&self, id: &str, request: UpdateProfileRequest) -> Result<User, AppError> {
        if let Err(errors) = request.validate() {
            return Err(AppError::Validation(validation_message(&errors)));
        }
        if let Some(birth_date) = request.birth_date {
            if birth_date > Utc::now().date_naive() {
                return Err(AppError::Validation(ValidationError::out_of_range(
                    "birth_date",
                    "birth date cannot be in the future",
                )));
            }
        }

        let mut record = self.load(id).await?;
        if let Some(name) = request.name {
            record.name = name.trim().to_string();
        }
        if let Some(birth_date) = request.birth_date {
            record.birth_date = Some(birth_date.format("%Y-%m-%d").to_string());
        }
        if let Some(gender) = request.gender {
            record.gender = Some(gender);
        }
        if let Some(height_cm) = request.height_cm {
            record.height_cm = Some(height_cm);
        }

        let updated = self
            .repository
            .update(record)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        info!("Updated profile of user {}", id);
        conversions::convert_to_domain_user(updated).map_err(AppError::Internal)
    }
}

/// Create a default user service using the repository from data layer
pub fn create_default_user_service(metrics: Arc<dyn MetricsServiceTrait>) -> impl UserServiceTrait {
    UserService::new(UserRepository::new(), metrics, admin_emails_from_env())
}
