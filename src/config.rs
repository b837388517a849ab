use std::time::Duration;

use crate::error::GuardError;

/// Default lease TTL for both the presence key and the leader key.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(4);

/// Per-guard configuration.
///
/// Every field is explicit per guard instance so multiple independently
/// configured jobs can coexist in one process — there is no process-wide
/// TTL default.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Logical job identifier. Identical across every instance running the
    /// same job; must be distinct across unrelated jobs.
    pub job_name: String,
    /// Expiry applied to both the presence key and the leader key.
    pub lease_ttl: Duration,
    /// Cadence of the background presence renewal loop.
    pub renew_interval: Duration,
    /// Upper bound on any single store call. A slow or partitioned store
    /// must not stall tick dispatch or the renewal loop.
    pub op_timeout: Duration,
}

impl GuardConfig {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            lease_ttl: DEFAULT_LEASE_TTL,
            renew_interval: DEFAULT_LEASE_TTL / 2,
            op_timeout: DEFAULT_LEASE_TTL / 4,
        }
    }

    /// Set the lease TTL; the renewal interval and op timeout are re-derived
    /// (TTL/2 and TTL/4) unless overridden afterwards.
    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self.renew_interval = ttl / 2;
        self.op_timeout = ttl / 4;
        self
    }

    pub fn with_renew_interval(mut self, interval: Duration) -> Self {
        self.renew_interval = interval;
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// The renewal interval must be strictly shorter than the TTL so one
    /// missed renewal does not lose the lease.
    pub fn validate(&self) -> Result<(), GuardError> {
        if self.job_name.is_empty() {
            return Err(GuardError::InvalidConfig("job_name must not be empty".into()));
        }
        if self.lease_ttl.is_zero() {
            return Err(GuardError::InvalidConfig("lease_ttl must be non-zero".into()));
        }
        if self.renew_interval.is_zero() || self.renew_interval >= self.lease_ttl {
            return Err(GuardError::InvalidConfig(format!(
                "renew_interval ({:?}) must be non-zero and shorter than lease_ttl ({:?})",
                self.renew_interval, self.lease_ttl
            )));
        }
        if self.op_timeout.is_zero() || self.op_timeout >= self.lease_ttl {
            return Err(GuardError::InvalidConfig(format!(
                "op_timeout ({:?}) must be non-zero and shorter than lease_ttl ({:?})",
                self.op_timeout, self.lease_ttl
            )));
        }
        Ok(())
    }
}
