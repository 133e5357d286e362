// HealthManager Data
// Persistence for users, health records and alerts

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
