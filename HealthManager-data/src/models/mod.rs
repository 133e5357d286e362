// Storage models, one per table
pub mod alert;
pub mod health_record;
pub mod user;

pub use alert::{AlertFilter, AlertRecord};
pub use health_record::{HealthRecord, HealthRecordFilter, NewHealthRecord};
pub use user::{NewUser, UserRecord};
