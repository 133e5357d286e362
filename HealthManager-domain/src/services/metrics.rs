use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

/// Counter names used across the services
pub const HEALTH_RECORDS_CREATED: &str = "health_records.created";
pub const HEALTH_RECORDS_DELETED: &str = "health_records.deleted";
pub const ALERTS_TRIGGERED: &str = "alerts.triggered";
pub const USERS_REGISTERED: &str = "users.registered";
pub const LOGINS_SUCCEEDED: &str = "auth.logins";
pub const LOGINS_FAILED: &str = "auth.login_failures";

/// Named counters shared by the services
pub trait MetricsServiceTrait: Send + Sync {
    fn increment(&self, name: &str);

    fn increment_by(&self, name: &str, amount: u64);

    /// Current value, 0 for unknown counters
    fn get(&self, name: &str) -> u64;

    /// Sorted copy of every counter
    fn snapshot(&self) -> BTreeMap<String, u64>;

    fn reset(&self);
}

/// In-process counter registry
#[derive(Debug, Default)]
pub struct MetricsService {
    counters: RwLock<BTreeMap<String, u64>>,
}

impl MetricsService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsServiceTrait for MetricsService {
    fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    fn increment_by(&self, name: &str, amount: u64) {
        // A poisoned counter map is still a valid map
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(name.to_string()).or_insert(0);
        *counter = counter.saturating_add(amount);
        debug!("Metric {} = {}", name, counter);
    }

    fn get(&self, name: &str) -> u64 {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        counters.get(name).copied().unwrap_or(0)
    }

    fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn reset(&self) {
        self.counters.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Create the default metrics registry
pub fn create_default_metrics_service() -> impl MetricsServiceTrait {
    MetricsService::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters() {
        let metrics = MetricsService::new();
        assert_eq!(metrics.get(HEALTH_RECORDS_CREATED), 0);

        metrics.increment(HEALTH_RECORDS_CREATED);
        metrics.increment_by(HEALTH_RECORDS_CREATED, 4);
        metrics.increment(ALERTS_TRIGGERED);

        assert_eq!(metrics.get(HEALTH_RECORDS_CREATED), 5);
        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot.keys().collect::<Vec<_>>(),
            vec![ALERTS_TRIGGERED, HEALTH_RECORDS_CREATED]
        );

        metrics.reset();
        assert!(metrics.snapshot().is_empty());
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(MetricsService::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.increment("requests");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.get("requests"), 800);
    }
}
