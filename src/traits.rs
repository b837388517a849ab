use std::future::Future;
use std::time::Duration;

/// Result of a single acquire-or-confirm call against the leader key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The leader key already holds this instance's ID.
    Confirmed,
    /// The leader key was absent and this instance's claim won.
    Acquired,
    /// Another instance holds the leader key; its ID is returned unchanged.
    HeldBy(String),
    /// The leader key was absent but a concurrent claim won the race.
    /// Normal outcome under contention, not an error.
    Contended,
}

/// The two atomic lease operations against the shared key-value store.
///
/// Each must execute as one indivisible transaction server-side — no other
/// client may observe a partial effect. Any store offering conditional
/// set-if-absent plus owner-scoped expiry refresh satisfies this; the NATS
/// JetStream KV backend lives in [`crate::nats_impls`], an in-memory mock in
/// [`crate::mocks`].
pub trait LeaseStore: Send + Sync + Clone + 'static {
    type Error: std::error::Error + Send + Sync;

    /// "I am alive": unconditionally (re)set `presence_key` with expiry
    /// `ttl`, then refresh `leader_key`'s expiry iff its value equals
    /// `self_id`. An absent leader key is a silent no-op — renewal never
    /// originates a claim.
    fn renew(
        &self,
        presence_key: &str,
        leader_key: &str,
        self_id: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Read `leader_key`; if it equals `self_id` confirm, if absent claim it
    /// with expiry `ttl` conditioned on absence, otherwise report the
    /// current holder without writing.
    fn try_acquire_or_confirm(
        &self,
        leader_key: &str,
        self_id: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<ClaimOutcome, Self::Error>> + Send;
}
