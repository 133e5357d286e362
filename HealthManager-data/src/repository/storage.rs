use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::database::DatabasePool;
use crate::models::user::{decode_roles, encode_roles};
use crate::models::{AlertFilter, AlertRecord, HealthRecord, HealthRecordFilter, UserRecord};
use super::errors::RepositoryError;

const RECORD_COLUMNS: &str =
    "id, user_id, metric_type, value, secondary_value, unit, timestamp, notes, created_at";
const USER_COLUMNS: &str =
    "id, email, password_hash, name, roles, birth_date, gender, height_cm, created_at, updated_at";
const ALERT_COLUMNS: &str =
    "id, user_id, rule_id, metric_type, level, message, value, timestamp, handled";

/// Database storage operations
pub struct DatabaseStorage;

fn connection(pool: &DatabasePool) -> Result<PooledConnection<SqliteConnectionManager>, RepositoryError> {
    match pool {
        DatabasePool::SQLite(pool) => Ok(pool.get()?),
    }
}

/// Unique constraint failures are caller errors, not storage failures
fn map_constraint(err: rusqlite::Error, what: &str) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            RepositoryError::Duplicate(what.to_string())
        }
        other => RepositoryError::Sqlite(other),
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HealthRecord> {
    Ok(HealthRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        metric_type: row.get(2)?,
        value: row.get(3)?,
        secondary_value: row.get(4)?,
        unit: row.get(5)?,
        timestamp: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let roles: String = row.get(4)?;
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        roles: decode_roles(&roles),
        birth_date: row.get(5)?,
        gender: row.get(6)?,
        height_cm: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<AlertRecord> {
    Ok(AlertRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        rule_id: row.get(2)?,
        metric_type: row.get(3)?,
        level: row.get(4)?,
        message: row.get(5)?,
        value: row.get(6)?,
        timestamp: row.get(7)?,
        handled: row.get::<_, i64>(8)? != 0,
    })
}

impl DatabaseStorage {
    /// Store a health record in the database
    pub async fn store_record(pool: &DatabasePool, record: &HealthRecord) -> Result<(), RepositoryError> {
        debug!("Storing health record in database: id={}", record.id);
        let conn = connection(pool)?;

        conn.execute(
            &format!("INSERT INTO health_records ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", RECORD_COLUMNS),
            params![
                record.id,
                record.user_id,
                record.metric_type,
                record.value,
                record.secondary_value,
                record.unit,
                record.timestamp,
                record.notes,
                record.created_at,
            ],
        )?;

        Ok(())
    }

    /// Get a health record by ID from the database
    pub async fn get_record(pool: &DatabasePool, id: &str) -> Result<Option<HealthRecord>, RepositoryError> {
        debug!("Getting health record by ID from database: id={}", id);
        let conn = connection(pool)?;

        let record = conn
            .query_row(
                &format!("SELECT {} FROM health_records WHERE id = ?1", RECORD_COLUMNS),
                [id],
                record_from_row,
            )
            .optional()?;

        Ok(record)
    }

    /// Delete a health record, returning whether a row was removed
    pub async fn delete_record(pool: &DatabasePool, id: &str) -> Result<bool, RepositoryError> {
        debug!("Deleting health record from database: id={}", id);
        let conn = connection(pool)?;
        let affected = conn.execute("DELETE FROM health_records WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Get filtered health records from the database together with the unpaged total
    pub async fn get_filtered_records(
        pool: &DatabasePool,
        filter: &HealthRecordFilter,
    ) -> Result<(Vec<HealthRecord>, usize), RepositoryError> {
        debug!("Getting filtered health records from database for user {}", filter.user_id);
        let conn = connection(pool)?;

        let sort_direction = if filter.sort_desc.unwrap_or(true) { "DESC" } else { "ASC" };

        let mut where_clauses = vec!["user_id = ?"];
        let mut params: Vec<&dyn ToSql> = vec![&filter.user_id as &dyn ToSql];

        if let Some(ref metric_type) = filter.metric_type {
            where_clauses.push("metric_type = ?");
            params.push(metric_type);
        }
        if let Some(ref start) = filter.start_date {
            where_clauses.push("timestamp >= ?");
            params.push(start);
        }
        if let Some(ref end) = filter.end_date {
            where_clauses.push("timestamp <= ?");
            params.push(end);
        }

        let where_sql = where_clauses.join(" AND ");

        let mut query = format!(
            "SELECT {} FROM health_records WHERE {} ORDER BY timestamp {}",
            RECORD_COLUMNS, where_sql, sort_direction
        );
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        query.push_str(&format!(" LIMIT {} OFFSET {}", limit, filter.offset.unwrap_or(0)));

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), record_from_row)?;

        let mut result = Vec::new();
        for record in rows {
            result.push(record?);
        }

        let count_query = format!("SELECT COUNT(*) FROM health_records WHERE {}", where_sql);
        let total: i64 = conn.query_row(&count_query, params_from_iter(params.iter()), |row| row.get(0))?;

        Ok((result, total as usize))
    }

    /// Insert or replace a user
    pub async fn store_user(pool: &DatabasePool, user: &UserRecord) -> Result<(), RepositoryError> {
        debug!("Storing user in database: id={}", user.id);
        let conn = connection(pool)?;

        conn.execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    password_hash = excluded.password_hash,
                    name = excluded.name,
                    roles = excluded.roles,
                    birth_date = excluded.birth_date,
                    gender = excluded.gender,
                    height_cm = excluded.height_cm,
                    updated_at = excluded.updated_at",
                USER_COLUMNS
            ),
            params![
                user.id,
                user.email,
                user.password_hash,
                user.name,
                encode_roles(&user.roles),
                user.birth_date,
                user.gender,
                user.height_cm,
                user.created_at,
                user.updated_at,
            ],
        )
        .map_err(|e| map_constraint(e, &format!("email {}", user.email)))?;

        Ok(())
    }

    pub async fn get_user(pool: &DatabasePool, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        debug!("Getting user by ID from database: id={}", id);
        let conn = connection(pool)?;
        let user = conn
            .query_row(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS), [id], user_from_row)
            .optional()?;
        Ok(user)
    }

    pub async fn get_user_by_email(pool: &DatabasePool, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        debug!("Getting user by email from database");
        let conn = connection(pool)?;
        let user = conn
            .query_row(&format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS), [email], user_from_row)
            .optional()?;
        Ok(user)
    }

    pub async fn store_alert(pool: &DatabasePool, alert: &AlertRecord) -> Result<(), RepositoryError> {
        debug!("Storing alert in database: id={}", alert.id);
        let conn = connection(pool)?;

        conn.execute(
            &format!("INSERT INTO alerts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", ALERT_COLUMNS),
            params![
                alert.id,
                alert.user_id,
                alert.rule_id,
                alert.metric_type,
                alert.level,
                alert.message,
                alert.value,
                alert.timestamp,
                alert.handled as i64,
            ],
        )?;

        Ok(())
    }

    /// Alerts for a user, newest first
    pub async fn get_alerts(pool: &DatabasePool, filter: &AlertFilter) -> Result<Vec<AlertRecord>, RepositoryError> {
        debug!("Getting alerts from database for user {}", filter.user_id);
        let conn = connection(pool)?;

        let mut query = format!("SELECT {} FROM alerts WHERE user_id = ?", ALERT_COLUMNS);
        let mut params: Vec<&dyn ToSql> = vec![&filter.user_id as &dyn ToSql];

        if let Some(ref metric_type) = filter.metric_type {
            query.push_str(" AND metric_type = ?");
            params.push(metric_type);
        }
        if filter.active_only {
            query.push_str(" AND handled = 0");
        }
        query.push_str(" ORDER BY timestamp DESC");

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), alert_from_row)?;

        let mut result = Vec::new();
        for alert in rows {
            result.push(alert?);
        }
        Ok(result)
    }

    pub async fn mark_alert_handled(pool: &DatabasePool, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let conn = connection(pool)?;
        let affected = conn.execute(
            "UPDATE alerts SET handled = 1 WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        Ok(affected > 0)
    }

    pub async fn delete_alerts(pool: &DatabasePool, user_id: &str, handled_only: bool) -> Result<usize, RepositoryError> {
        let conn = connection(pool)?;
        let sql = if handled_only {
            "DELETE FROM alerts WHERE user_id = ?1 AND handled = 1"
        } else {
            "DELETE FROM alerts WHERE user_id = ?1"
        };
        Ok(conn.execute(sql, [user_id])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_pool, DatabaseConfig, DatabaseType};

    fn memory_pool() -> DatabasePool {
        create_pool(&DatabaseConfig {
            db_type: DatabaseType::Memory,
            sqlite_path: None,
            ..DatabaseConfig::default()
        })
        .unwrap()
    }

    fn record(id: &str, metric: &str, ts: &str, value: f64) -> HealthRecord {
        HealthRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            metric_type: metric.to_string(),
            value,
            secondary_value: if metric == "BLOOD_PRESSURE" { Some(80.0) } else { None },
            unit: "x".to_string(),
            timestamp: ts.to_string(),
            notes: None,
            created_at: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_filtering_matches_sql_and_counts() {
        let pool = memory_pool();
        DatabaseStorage::store_record(&pool, &record("1", "HEART_RATE", "2024-03-01T08:00:00Z", 70.0)).await.unwrap();
        DatabaseStorage::store_record(&pool, &record("2", "HEART_RATE", "2024-03-02T08:00:00Z", 75.0)).await.unwrap();
        DatabaseStorage::store_record(&pool, &record("3", "BLOOD_PRESSURE", "2024-03-03T08:00:00Z", 120.0)).await.unwrap();

        let filter = HealthRecordFilter {
            metric_type: Some("HEART_RATE".to_string()),
            start_date: Some("2024-03-02T00:00:00Z".to_string()),
            ..HealthRecordFilter::for_user("user-1")
        };
        let (records, total) = DatabaseStorage::get_filtered_records(&pool, &filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(records[0].id, "2");

        let paged = HealthRecordFilter {
            limit: Some(2),
            offset: Some(1),
            ..HealthRecordFilter::for_user("user-1")
        };
        let (records, total) = DatabaseStorage::get_filtered_records(&pool, &paged).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["2", "1"]);

        let bp = DatabaseStorage::get_record(&pool, "3").await.unwrap().unwrap();
        assert_eq!(bp.secondary_value, Some(80.0));

        assert!(DatabaseStorage::delete_record(&pool, "3").await.unwrap());
        assert!(!DatabaseStorage::delete_record(&pool, "3").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_user_email_maps_to_duplicate() {
        let pool = memory_pool();
        let user = UserRecord {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "A".to_string(),
            roles: vec!["user".to_string(), "admin".to_string()],
            birth_date: Some("1990-05-01".to_string()),
            gender: None,
            height_cm: Some(180.0),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };
        DatabaseStorage::store_user(&pool, &user).await.unwrap();

        let loaded = DatabaseStorage::get_user_by_email(&pool, "a@example.com").await.unwrap().unwrap();
        assert_eq!(loaded, user);

        let clash = UserRecord { id: "u2".to_string(), ..user.clone() };
        let err = DatabaseStorage::store_user(&pool, &clash).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));

        let renamed = UserRecord { name: "B".to_string(), ..user };
        DatabaseStorage::store_user(&pool, &renamed).await.unwrap();
        assert_eq!(DatabaseStorage::get_user(&pool, "u1").await.unwrap().unwrap().name, "B");
    }

    #[tokio::test]
    async fn test_alert_lifecycle() {
        let pool = memory_pool();
        let alert = AlertRecord {
            id: "a1".to_string(),
            user_id: "user-1".to_string(),
            rule_id: "low-oxygen".to_string(),
            metric_type: "BLOOD_OXYGEN".to_string(),
            level: "high".to_string(),
            message: "Blood oxygen too low".to_string(),
            value: 91.0,
            timestamp: "2024-03-01T08:00:00Z".to_string(),
            handled: false,
        };
        DatabaseStorage::store_alert(&pool, &alert).await.unwrap();

        assert!(!DatabaseStorage::mark_alert_handled(&pool, "someone-else", "a1").await.unwrap());
        assert!(DatabaseStorage::mark_alert_handled(&pool, "user-1", "a1").await.unwrap());

        let active = AlertFilter { user_id: "user-1".to_string(), metric_type: None, active_only: true };
        assert!(DatabaseStorage::get_alerts(&pool, &active).await.unwrap().is_empty());

        assert_eq!(DatabaseStorage::delete_alerts(&pool, "user-1", true).await.unwrap(), 1);
    }
}
