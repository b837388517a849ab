use tracing::{debug, info, trace, warn};

use crate::{
    config::GuardConfig,
    error::GuardError,
    identity,
    traits::{ClaimOutcome, LeaseStore},
};

/// Outcome of one per-tick leadership decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// This instance holds the lease; the job body may run this tick.
    Leader,
    /// Another instance holds the lease; skip silently.
    NotLeader,
    /// Leadership could not be determined (store error or timeout).
    /// Fail closed: skip — running twice is worse than skipping once.
    Undetermined,
}

/// Per-tick leader decision for one job on one instance.
///
/// There is no cached leader state: every tick performs one
/// acquire-or-confirm call against the store, so a surviving instance
/// notices an expired lease on its very next tick with no separate
/// failover detector.
pub struct LeaderGuard<S: LeaseStore> {
    store: S,
    config: GuardConfig,
    instance_id: String,
    leader_key: String,
}

impl<S: LeaseStore> LeaderGuard<S> {
    pub fn new(store: S, config: GuardConfig) -> Result<Self, GuardError> {
        config.validate()?;
        let instance_id = identity::instance_id(&config.job_name);
        let leader_key = identity::leader_key(&config.job_name);
        Ok(Self {
            store,
            config,
            instance_id,
            leader_key,
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn leader_key(&self) -> &str {
        &self.leader_key
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Decide whether this instance may run the job body this tick.
    ///
    /// Never returns an error: every failure degrades to a skipped tick and
    /// a logged event, so a bad tick cannot crash the hosting scheduler.
    pub async fn check(&self) -> GuardState {
        let claim = tokio::time::timeout(
            self.config.op_timeout,
            self.store.try_acquire_or_confirm(
                &self.leader_key,
                &self.instance_id,
                self.config.lease_ttl,
            ),
        )
        .await;

        match claim {
            Ok(Ok(ClaimOutcome::Acquired)) => {
                info!(
                    job_name = %self.config.job_name,
                    instance_id = %self.instance_id,
                    "Acquired job leadership"
                );
                GuardState::Leader
            }
            Ok(Ok(ClaimOutcome::Confirmed)) => {
                trace!(
                    job_name = %self.config.job_name,
                    instance_id = %self.instance_id,
                    "Leadership confirmed"
                );
                GuardState::Leader
            }
            Ok(Ok(ClaimOutcome::HeldBy(other))) => {
                debug!(
                    job_name = %self.config.job_name,
                    instance_id = %self.instance_id,
                    leader = %other,
                    "Another instance leads, skipping tick"
                );
                GuardState::NotLeader
            }
            Ok(Ok(ClaimOutcome::Contended)) => {
                debug!(
                    job_name = %self.config.job_name,
                    instance_id = %self.instance_id,
                    "Lost leadership claim race, skipping tick"
                );
                GuardState::NotLeader
            }
            Ok(Err(e)) => {
                warn!(
                    job_name = %self.config.job_name,
                    instance_id = %self.instance_id,
                    error = %e,
                    "Lease store unavailable, skipping tick"
                );
                GuardState::Undetermined
            }
            Err(_elapsed) => {
                warn!(
                    job_name = %self.config.job_name,
                    instance_id = %self.instance_id,
                    timeout = ?self.config.op_timeout,
                    "Leadership check timed out, skipping tick"
                );
                GuardState::Undetermined
            }
        }
    }
}
