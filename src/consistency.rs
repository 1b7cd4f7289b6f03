//! Read-your-writes helpers.
//!
//! After a write that becomes visible asynchronously (clustered deployments,
//! event-driven projections), callers poll for the node with exponential
//! backoff. The outcome is returned as a [`WaitOutcome`]; a timeout is not an
//! error, but callers can tell it apart from a confirmation.

use std::time::{Duration, Instant};

use crate::models::NodeLabel;
use crate::repositories::CommonRepository;
use crate::tenant::Tenant;

/// Exponential backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
    pub max_retries: u32,
}

impl BackoffPolicy {
    /// 100ms growing 1.5x per attempt up to 1s, for at most 5s or 10 attempts.
    pub fn standard() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            multiplier: 1.5,
            max_interval: Duration::from_secs(1),
            max_elapsed: Duration::from_secs(5),
            max_retries: 10,
        }
    }

    /// 200ms doubling up to 3s, for at most 20s or 20 attempts.
    pub fn extended() -> Self {
        Self {
            initial_interval: Duration::from_millis(200),
            multiplier: 2.0,
            max_interval: Duration::from_secs(3),
            max_elapsed: Duration::from_secs(20),
            max_retries: 20,
        }
    }

    /// Standard policy capped at `max_wait` overall.
    pub fn with_max_wait(max_wait: Duration) -> Self {
        Self {
            max_elapsed: max_wait,
            ..Self::standard()
        }
    }

    /// Interval following `current`, capped at `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let next = current.mul_f64(self.multiplier.max(1.0));
        next.min(self.max_interval)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Result of waiting for a node to reach the expected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Confirmed { attempts: u32, elapsed: Duration },
    TimedOut { attempts: u32, elapsed: Duration },
}

impl WaitOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, WaitOutcome::Confirmed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            WaitOutcome::Confirmed { attempts, .. } | WaitOutcome::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            WaitOutcome::Confirmed { elapsed, .. } | WaitOutcome::TimedOut { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

/// Waits until the node exists, using [`BackoffPolicy::standard`].
pub async fn wait_for_node_created(
    common: &CommonRepository,
    tenant: &Tenant,
    id: &str,
    label: NodeLabel,
) -> WaitOutcome {
    wait_for_node(common, tenant, id, label, true, &BackoffPolicy::standard()).await
}

/// Waits until the node no longer exists, using [`BackoffPolicy::standard`].
pub async fn wait_for_node_deleted(
    common: &CommonRepository,
    tenant: &Tenant,
    id: &str,
    label: NodeLabel,
) -> WaitOutcome {
    wait_for_node(common, tenant, id, label, false, &BackoffPolicy::standard()).await
}

/// Waits until the node exists, giving up after `max_wait`.
pub async fn wait_for_node_created_with_max_wait(
    common: &CommonRepository,
    tenant: &Tenant,
    id: &str,
    label: NodeLabel,
    max_wait: Duration,
) -> WaitOutcome {
    let policy = BackoffPolicy::with_max_wait(max_wait);
    wait_for_node(common, tenant, id, label, true, &policy).await
}

/// Polls `exists_by_id` until it returns `should_exist`.
///
/// A failed lookup counts as "not yet" and is retried.
pub async fn wait_for_node(
    common: &CommonRepository,
    tenant: &Tenant,
    id: &str,
    label: NodeLabel,
    should_exist: bool,
    policy: &BackoffPolicy,
) -> WaitOutcome {
    let started = Instant::now();
    let mut interval = policy.initial_interval;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match common.exists_by_id(tenant, id, label).await {
            Ok(exists) if exists == should_exist => {
                return WaitOutcome::Confirmed {
                    attempts,
                    elapsed: started.elapsed(),
                };
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(tenant = %tenant, id, label = %label, error = %err, "wait_for_node lookup failed");
            }
        }

        let elapsed = started.elapsed();
        if attempts >= policy.max_retries || elapsed + interval > policy.max_elapsed {
            tracing::warn!(
                tenant = %tenant,
                id,
                label = %label,
                should_exist,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "wait_for_node timed out"
            );
            return WaitOutcome::TimedOut { attempts, elapsed };
        }

        tokio::time::sleep(interval).await;
        interval = policy.next_interval(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockExecutor;
    use crate::graph::Row;
    use serde_json::json;
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_millis(1),
            multiplier: 2.0,
            max_interval: Duration::from_millis(4),
            max_elapsed: Duration::from_secs(5),
            max_retries,
        }
    }

    fn exists(value: bool) -> Vec<Row> {
        vec![Row::from([("exists", json!(value))])]
    }

    #[test]
    fn test_next_interval_is_capped() {
        let policy = BackoffPolicy::standard();
        assert_eq!(
            policy.next_interval(Duration::from_millis(100)),
            Duration::from_millis(150)
        );
        assert_eq!(
            policy.next_interval(Duration::from_millis(900)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_presets() {
        let extended = BackoffPolicy::extended();
        assert!(extended.max_elapsed > BackoffPolicy::standard().max_elapsed);
        assert_eq!(
            BackoffPolicy::with_max_wait(Duration::from_secs(2)).max_elapsed,
            Duration::from_secs(2)
        );
    }

    #[tokio::test]
    async fn test_confirmed_after_retries() {
        let mock = Arc::new(
            MockExecutor::new()
                .with_rows(exists(false))
                .with_error("leader switch")
                .with_rows(exists(true)),
        );
        let common = CommonRepository::new(mock.clone());
        let tenant = Tenant::new("acme").unwrap();

        let outcome = wait_for_node(&common, &tenant, "c1", NodeLabel::Contact, true, &fast_policy(10)).await;

        assert_eq!(outcome.attempts(), 3);
        assert!(outcome.is_confirmed());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_timed_out_is_typed_not_error() {
        let mock = Arc::new(MockExecutor::new());
        let common = CommonRepository::new(mock.clone());
        let tenant = Tenant::new("acme").unwrap();

        let outcome = wait_for_node(&common, &tenant, "c1", NodeLabel::Contact, true, &fast_policy(4)).await;

        assert!(matches!(outcome, WaitOutcome::TimedOut { attempts: 4, .. }));
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_deleted_confirmed_when_missing() {
        let mock = Arc::new(MockExecutor::new().with_rows(exists(false)));
        let common = CommonRepository::new(mock.clone());
        let tenant = Tenant::new("acme").unwrap();

        let outcome = wait_for_node_deleted(&common, &tenant, "o1", NodeLabel::Organization).await;

        assert_eq!(
            outcome,
            WaitOutcome::Confirmed {
                attempts: 1,
                elapsed: outcome.elapsed()
            }
        );
    }
}
