use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::env;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::token_blacklist;
use crate::auth::Claims;
use crate::errors::{AppError, AuthError};

const DEFAULT_ISSUER: &str = "health-manager-api";
const DEFAULT_ACCESS_EXPIRATION_SECS: i64 = 900;
const DEFAULT_REFRESH_EXPIRATION_SECS: i64 = 604_800;

/// Security errors for token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT could not be encoded or verified
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// A refresh token was presented where an access token is expected, or the reverse
    #[error("Expected a {0} token")]
    WrongTokenType(&'static str),

    #[error("Security configuration error: {0}")]
    ConfigError(String),

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Security error: {0}")]
    Generic(String),
}

impl From<SecurityError> for AppError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::TokenExpired => AppError::Auth(AuthError::TokenExpired),
            SecurityError::TokenRevoked => AppError::Auth(AuthError::TokenRevoked),
            SecurityError::TokenValidation(_) | SecurityError::InvalidToken | SecurityError::WrongTokenType(_) => {
                AppError::Auth(AuthError::InvalidToken)
            }
            SecurityError::ConfigError(msg) | SecurityError::Generic(msg) => AppError::Internal(msg),
        }
    }
}

/// Token types for authentication
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    /// Short-lived access token
    Access,
    /// Long-lived refresh token
    Refresh,
}

impl TokenType {
    /// Value of the `typ` claim
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }

    /// Lifetime of this token type, from `ACCESS_TOKEN_EXPIRATION` / `REFRESH_TOKEN_EXPIRATION` (seconds)
    pub fn expiration(&self) -> Duration {
        let (var, default) = match self {
            TokenType::Access => ("ACCESS_TOKEN_EXPIRATION", DEFAULT_ACCESS_EXPIRATION_SECS),
            TokenType::Refresh => ("REFRESH_TOKEN_EXPIRATION", DEFAULT_REFRESH_EXPIRATION_SECS),
        };
        let seconds = env::var(var)
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(default);
        Duration::seconds(seconds)
    }
}

fn jwt_secret() -> Result<String, SecurityError> {
    env::var("JWT_SECRET").map_err(|e| {
        error!("JWT_SECRET environment variable not found: {}", e);
        SecurityError::ConfigError("JWT_SECRET environment variable not found".to_string())
    })
}

fn issuer() -> String {
    env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string())
}

/// Generate a signed token for a user
pub fn generate_token(
    user_id: &str,
    email: &str,
    roles: &[String],
    token_type: TokenType,
) -> Result<String, SecurityError> {
    let secret = jwt_secret()?;
    let now = Utc::now();
    let expiration = now + token_type.expiration();

    let claims = Claims {
        sub: user_id.to_string(),
        iss: issuer(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
        jti: Uuid::new_v4().to_string(),
        typ: token_type.as_str().to_string(),
        email: email.to_string(),
        roles: roles.to_vec(),
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| {
        error!("Failed to encode JWT token: {}", e);
        SecurityError::TokenValidation(e.to_string())
    })?;

    info!("Generated {:?} token for user {}", token_type, user_id);
    debug!("Token expiration: {}", expiration);
    Ok(token)
}

/// Validate a token, its type and its revocation status
pub fn validate_token(token: &str, expected: TokenType) -> Result<Claims, SecurityError> {
    let secret = jwt_secret()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.set_issuer(&[issuer()]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation).map_err(
        |e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                SecurityError::TokenValidation("Invalid signature".to_string())
            }
            _ => SecurityError::TokenValidation(e.to_string()),
        },
    )?;

    let claims = token_data.claims;
    if claims.typ != expected.as_str() {
        return Err(SecurityError::WrongTokenType(expected.as_str()));
    }

    if token_blacklist::blacklist().is_revoked(&claims.jti) {
        debug!("Token {} of user {} is revoked", claims.jti, claims.sub);
        return Err(SecurityError::TokenRevoked);
    }

    Ok(claims)
}

/// Revoke a single token until its natural expiry
pub fn revoke_token(claims: &Claims) -> Result<(), SecurityError> {
    info!("Revoking {} token {} of user {}", claims.typ, claims.jti, claims.sub);
    if token_blacklist::blacklist().revoke_token(&claims.jti, claims.exp) {
        Ok(())
    } else {
        Err(SecurityError::Generic("Token revocation list is full".to_string()))
    }
}
