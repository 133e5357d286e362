use serde::{Deserialize, Serialize};

/// Storage model for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    /// Lowercased, unique
    pub email: String,
    /// PHC string produced by the password hasher
    pub password_hash: String,
    pub name: String,
    pub roles: Vec<String>,
    /// `YYYY-MM-DD`
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input data for creating an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub roles: Vec<String>,
}

/// Roles are stored as a comma separated column
pub fn encode_roles(roles: &[String]) -> String {
    roles.join(",")
}

pub fn decode_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}
