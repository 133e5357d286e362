use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use once_cell::sync::Lazy;
use tracing::{debug, error, info, warn};

const DEFAULT_MAX_SIZE: usize = 10_000;

/// Process-wide blacklist of revoked token ids
static TOKEN_BLACKLIST: Lazy<TokenBlacklist> = Lazy::new(TokenBlacklist::from_env);

/// A revoked token and when it would have expired (unix seconds)
#[derive(Debug, Clone, Copy)]
struct Revocation {
    expires_at: i64,
}

/// Thread-safe set of revoked token ids (`jti` claims).
///
/// Entries only need to live until the token would have expired anyway, so
/// expired entries are dropped on cleanup. When the list is full, expired
/// entries are pruned. A live revocation is never evicted: if no room can be
/// made the new revocation is refused.
pub struct TokenBlacklist {
    revoked_tokens: Arc<Mutex<HashMap<String, Revocation>>>,
    max_size: usize,
}

impl Default for TokenBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            revoked_tokens: Arc::new(Mutex::new(HashMap::new())),
            max_size: max_size.max(1),
        }
    }

    /// Size limit from `TOKEN_BLACKLIST_MAX_SIZE`
    pub fn from_env() -> Self {
        let max_size = std::env::var("TOKEN_BLACKLIST_MAX_SIZE")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_SIZE);
        Self::with_max_size(max_size)
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<String, Revocation>> {
        self.revoked_tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Revoke `token_id` until `expires_at` (unix seconds). Returns false when
    /// the list is full of live revocations and the token was not recorded.
    pub fn revoke_token(&self, token_id: &str, expires_at: i64) -> bool {
        let now = Utc::now().timestamp();
        let mut tokens = self.tokens();

        if tokens.len() >= self.max_size && !tokens.contains_key(token_id) {
            warn!("Token blacklist reached max size ({}), pruning", self.max_size);
            Self::remove_expired(&mut tokens, now);
            if tokens.len() >= self.max_size {
                error!(
                    "Token blacklist is full of live revocations ({}), refusing to revoke {}",
                    tokens.len(),
                    token_id
                );
                return false;
            }
        }

        tokens.insert(
            token_id.to_string(),
            Revocation { expires_at },
        );
        info!("Token revoked: {}", token_id);
        true
    }

    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.tokens().contains_key(token_id)
    }

    pub fn size(&self) -> usize {
        self.tokens().len()
    }

    /// Drop entries whose token has expired; returns how many were removed
    pub fn cleanup_expired_tokens(&self) -> usize {
        let mut tokens = self.tokens();
        Self::remove_expired(&mut tokens, Utc::now().timestamp())
    }

    fn remove_expired(tokens: &mut HashMap<String, Revocation>, now: i64) -> usize {
        let before = tokens.len();
        tokens.retain(|_, revocation| revocation.expires_at > now);
        let removed = before - tokens.len();
        if removed > 0 {
            debug!("Removed {} expired tokens from blacklist", removed);
        }
        removed
    }

}

/// The shared blacklist
pub fn blacklist() -> &'static TokenBlacklist {
    &TOKEN_BLACKLIST
}

/// Spawn an hourly cleanup of expired entries. Must run inside a tokio runtime.
pub fn start_cleanup_task() {
    use std::time::Duration;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let removed = blacklist().cleanup_expired_tokens();
            debug!("Blacklist cleanup removed {} tokens, {} remain", removed, blacklist().size());
        }
    });
}
