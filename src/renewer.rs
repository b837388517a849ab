use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::{config::GuardConfig, traits::LeaseStore};

/// Background lease renewal loop for one guard instance.
///
/// Runs on a wall-clock interval (the configured renewal interval),
/// independent of tick cadence: each iteration re-sets this instance's
/// presence key and refreshes the leader key's expiry when this instance
/// owns it. Renewal never originates a leadership claim; claiming happens
/// only in the tick path.
///
/// Errors are logged and the loop keeps going — transient store outages
/// just cost renewals until connectivity returns. The task is aborted when
/// the handle is dropped; on abrupt process death the lease simply lapses.
pub struct PresenceRenewer {
    handle: JoinHandle<()>,
}

impl PresenceRenewer {
    /// Spawn the renewal loop. Must be called within a Tokio runtime.
    /// The first renewal fires immediately.
    pub fn spawn<S: LeaseStore>(
        store: S,
        config: GuardConfig,
        instance_id: String,
        leader_key: String,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.renew_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let renew = store.renew(
                    &instance_id,
                    &leader_key,
                    &instance_id,
                    config.lease_ttl,
                );
                match tokio::time::timeout(config.op_timeout, renew).await {
                    Ok(Ok(())) => {
                        debug!(
                            job_name = %config.job_name,
                            instance_id = %instance_id,
                            "Presence renewed"
                        );
                    }
                    Ok(Err(e)) => {
                        warn!(
                            job_name = %config.job_name,
                            instance_id = %instance_id,
                            error = %e,
                            "Presence renewal failed, retrying next interval"
                        );
                    }
                    Err(_elapsed) => {
                        warn!(
                            job_name = %config.job_name,
                            instance_id = %instance_id,
                            timeout = ?config.op_timeout,
                            "Presence renewal timed out, retrying next interval"
                        );
                    }
                }
            }
        });
        Self { handle }
    }
}

impl Drop for PresenceRenewer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
