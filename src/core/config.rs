use crate::core::errors::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool configuration with all tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of long-lived workers consuming the job queue.
    pub workers: usize,
    /// Capacity of the bounded job queue.
    pub queue_capacity: usize,
    /// Per-task execution timeout. `None` lets tasks run unbounded.
    pub task_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
            task_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Default configuration with the given worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn task_timeout(mut self, limit: Duration) -> Self {
        self.task_timeout = Some(limit);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Rejects configurations the pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(DispatchError::invalid_configuration(
                "worker count must be at least 1",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(DispatchError::invalid_configuration(
                "queue capacity must be at least 1",
            ));
        }
        if let Some(limit) = self.task_timeout {
            if limit.is_zero() {
                return Err(DispatchError::invalid_configuration(
                    "task timeout must be non-zero when set",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = PoolConfig::with_workers(0);
        assert!(matches!(
            config.validate(),
            Err(DispatchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = PoolConfig::default().task_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrips_through_json() {
        let config = PoolConfig::with_workers(8).task_timeout(Duration::from_secs(30));
        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workers, 8);
        assert_eq!(back.task_timeout, Some(Duration::from_secs(30)));
    }
}
