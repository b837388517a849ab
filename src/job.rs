use std::future::Future;

use crate::{
    config::GuardConfig,
    error::GuardError,
    guard::{GuardState, LeaderGuard},
    renewer::PresenceRenewer,
    traits::LeaseStore,
};

/// A job body wrapped with the leader guard.
///
/// The external scheduler invokes [`run`](Self::run) exactly like it would an
/// unguarded job; the guard decides per tick whether the body executes here
/// or on another instance. Construction starts this instance's presence
/// renewer exactly once; each `GuardedJob` derives its own instance ID, so
/// two wrappers for the same job in one process never share a presence key.
pub struct GuardedJob<S: LeaseStore, F> {
    guard: LeaderGuard<S>,
    body: F,
    _renewer: PresenceRenewer,
}

impl<S, F, Fut> GuardedJob<S, F>
where
    S: LeaseStore,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    /// Wrap `body` with a leader guard for `config.job_name`.
    /// Must be called within a Tokio runtime (spawns the renewal loop).
    pub fn new(store: S, config: GuardConfig, body: F) -> Result<Self, GuardError> {
        let guard = LeaderGuard::new(store, config)?;
        let renewer = PresenceRenewer::spawn(
            guard.store().clone(),
            guard.config().clone(),
            guard.instance_id().to_string(),
            guard.leader_key().to_string(),
        );
        Ok(Self {
            guard,
            body,
            _renewer: renewer,
        })
    }

    /// One scheduled tick: run the guard decision, then the body if and only
    /// if this instance is the leader. The body's own semantics are
    /// untouched when it does run; on every other state the tick is a no-op.
    ///
    /// The returned state is diagnostic — schedulers are free to ignore it.
    pub async fn run(&self) -> GuardState {
        let state = self.guard.check().await;
        if state == GuardState::Leader {
            (self.body)().await;
        }
        state
    }

    pub fn instance_id(&self) -> &str {
        self.guard.instance_id()
    }

    pub fn guard(&self) -> &LeaderGuard<S> {
        &self.guard
    }
}
