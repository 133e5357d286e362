// Database modules
pub mod connection;
pub mod migrations;

// Re-export database connection functions
pub use connection::*;
