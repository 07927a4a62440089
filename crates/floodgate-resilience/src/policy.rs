//! Per-operation priority and retry policy.
//!
//! Read traffic, ordinary writes, and business-critical writes get different
//! default priorities and retry counts. The table is explicit and
//! overridable: per operation name when the facade is built, and per call
//! via [`Resilient::execute_with`](crate::Resilient::execute_with).

use floodgate_pool::Priority;
use std::collections::HashMap;
use std::time::Duration;

/// Broad class of a domain operation, used to pick policy defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// Catalog lookups, cart reads, account page queries.
    Read,
    /// Ordinary writes: cart updates, profile edits.
    Write,
    /// Writes with business-critical consequences, e.g. payment creation.
    Critical,
}

/// How one operation is submitted to the pool and retried.
#[derive(Debug, Clone)]
pub struct OperationPolicy {
    /// Queue priority when the pool is saturated.
    pub priority: Priority,
    /// Retries allowed for transient failures.
    pub retries: u32,
    /// Fixed delay between retry attempts.
    pub retry_delay: Duration,
    /// Cap on time spent queued; `None` uses the pool's acquisition timeout.
    pub timeout: Option<Duration>,
}

impl OperationPolicy {
    /// Creates a policy with the given priority and retry count, the default
    /// 500ms retry delay, and the pool's acquisition timeout.
    pub fn new(priority: Priority, retries: u32) -> Self {
        Self {
            priority,
            retries,
            retry_delay: Duration::from_millis(500),
            timeout: None,
        }
    }

    /// Replaces the retry delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Caps the time this operation may spend queued.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Policy defaults per class plus per-operation-name overrides.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    read: OperationPolicy,
    write: OperationPolicy,
    critical: OperationPolicy,
    overrides: HashMap<String, OperationPolicy>,
}

impl PolicyTable {
    /// Builds the default table from the configured retry settings:
    /// reads at `Normal` priority with the standard retry count, writes at
    /// `High`, and critical operations at `Critical` with one extra retry.
    pub fn new(retries: u32, retry_delay: Duration) -> Self {
        Self {
            read: OperationPolicy::new(Priority::Normal, retries).retry_delay(retry_delay),
            write: OperationPolicy::new(Priority::High, retries).retry_delay(retry_delay),
            critical: OperationPolicy::new(Priority::Critical, retries + 1)
                .retry_delay(retry_delay),
            overrides: HashMap::new(),
        }
    }

    /// Replaces the default policy for a class.
    pub fn set_class(mut self, class: OperationClass, policy: OperationPolicy) -> Self {
        match class {
            OperationClass::Read => self.read = policy,
            OperationClass::Write => self.write = policy,
            OperationClass::Critical => self.critical = policy,
        }
        self
    }

    /// Pins a policy to a specific operation name, overriding its class.
    pub fn set_operation(mut self, name: impl Into<String>, policy: OperationPolicy) -> Self {
        self.overrides.insert(name.into(), policy);
        self
    }

    /// Resolves the policy for a named operation of the given class.
    pub fn resolve(&self, name: &str, class: OperationClass) -> OperationPolicy {
        if let Some(policy) = self.overrides.get(name) {
            return policy.clone();
        }
        match class {
            OperationClass::Read => self.read.clone(),
            OperationClass::Write => self.write.clone(),
            OperationClass::Critical => self.critical.clone(),
        }
    }
}
