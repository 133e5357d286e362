use rusqlite::Connection;
use tracing::info;

use crate::database::DatabaseError;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Running SQLite migrations");

    create_users_table(conn)?;
    create_health_records_table(conn)?;
    create_alerts_table(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating users table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            roles TEXT NOT NULL,
            birth_date TEXT,
            gender TEXT,
            height_cm REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("users: {}", e)))
}

fn create_health_records_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating health_records table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS health_records (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            metric_type TEXT NOT NULL,
            value REAL NOT NULL,
            secondary_value REAL,
            unit TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_health_records_user_timestamp
        ON health_records (user_id, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_health_records_user_type
        ON health_records (user_id, metric_type);",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("health_records: {}", e)))
}

fn create_alerts_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating alerts table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS alerts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            rule_id TEXT NOT NULL,
            metric_type TEXT NOT NULL,
            level TEXT NOT NULL,
            message TEXT NOT NULL,
            value REAL NOT NULL,
            timestamp TEXT NOT NULL,
            handled INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_alerts_user_timestamp
        ON alerts (user_id, timestamp DESC);",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("alerts: {}", e)))
}
