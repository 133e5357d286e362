pub mod admin;
pub mod alerts;
pub mod analysis;
pub mod auth;
pub mod health;
pub mod health_records;
pub mod trends;
pub mod users;
pub mod vitals;

// Tests module
#[cfg(test)]
mod tests;

pub use health::health_check;
