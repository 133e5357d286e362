// Repository module structure
pub mod errors;
mod alert;
mod health_record;
mod in_memory;
mod storage;
mod user;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use alert::{AlertRepository, AlertRepositoryTrait};
pub use health_record::{HealthRecordRepository, HealthRecordRepositoryTrait};
pub use in_memory::InMemoryStorage;
pub use user::{UserRepository, UserRepositoryTrait};

// Mock repositories for both testing and when the mock feature is enabled
#[cfg(any(test, feature = "mock"))]
pub mod mocks {
    pub use super::alert::tests::MockAlertRepository;
    pub use super::health_record::tests::MockHealthRecordRepository;
    pub use super::user::tests::MockUserRepository;
}
