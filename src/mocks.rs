//! Mock implementations for unit testing without a real store.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! cron-guard = { path = "...", features = ["test-support"] }
//! ```

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use tokio::time::Instant;

use crate::traits::{ClaimOutcome, LeaseStore};

/// In-memory `LeaseStore` with real expirations on the Tokio clock.
///
/// Under `tokio::time::pause()`, `advance()` moves entries past their
/// expiry deterministically, so failover can be tested without sleeping.
#[derive(Clone, Default)]
pub struct MockLeaseStore {
    entries: Arc<Mutex<HashMap<String, MockEntry>>>,
    unavailable: Arc<AtomicBool>,
    deny_acquire: Arc<AtomicBool>,
    latency: Arc<Mutex<Option<Duration>>>,
}

struct MockEntry {
    value: String,
    expires_at: Instant,
}

impl MockLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage — every operation fails until
    /// [`set_available`](Self::set_available).
    pub fn set_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub fn set_available(&self) {
        self.unavailable.store(false, Ordering::SeqCst);
    }

    /// Simulate losing every claim race — an absent leader key resolves to
    /// `Contended` instead of `Acquired`.
    pub fn deny_acquire(&self) {
        self.deny_acquire.store(true, Ordering::SeqCst);
    }

    pub fn allow_acquire(&self) {
        self.deny_acquire.store(false, Ordering::SeqCst);
    }

    /// Delay every operation by `d`, simulating a slow or partitioned store.
    /// Callers bound by an op timeout should abandon the call.
    pub fn set_latency(&self, d: Duration) {
        *self.latency.lock().unwrap() = Some(d);
    }

    pub fn clear_latency(&self) {
        *self.latency.lock().unwrap() = None;
    }

    async fn apply_latency(&self) {
        let d = *self.latency.lock().unwrap();
        if let Some(d) = d {
            tokio::time::sleep(d).await;
        }
    }

    /// Current live value of the leader key, if any.
    pub fn current_leader(&self, leader_key: &str) -> Option<String> {
        let mut map = self.entries.lock().unwrap();
        purge_expired(&mut map, leader_key, Instant::now());
        map.get(leader_key).map(|e| e.value.clone())
    }

    /// Whether a key exists and has not expired.
    pub fn contains_live(&self, key: &str) -> bool {
        let mut map = self.entries.lock().unwrap();
        purge_expired(&mut map, key, Instant::now());
        map.contains_key(key)
    }
}

fn purge_expired(map: &mut HashMap<String, MockEntry>, key: &str, now: Instant) {
    if map.get(key).is_some_and(|e| e.expires_at <= now) {
        map.remove(key);
    }
}

#[derive(Debug)]
pub struct MockStoreError(pub &'static str);

impl std::fmt::Display for MockStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockStoreError {}

impl LeaseStore for MockLeaseStore {
    type Error = MockStoreError;

    async fn renew(
        &self,
        presence_key: &str,
        leader_key: &str,
        self_id: &str,
        ttl: Duration,
    ) -> Result<(), MockStoreError> {
        self.apply_latency().await;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MockStoreError("store unreachable"));
        }
        let now = Instant::now();
        let mut map = self.entries.lock().unwrap();
        map.insert(
            presence_key.to_string(),
            MockEntry {
                value: "1".to_string(),
                expires_at: now + ttl,
            },
        );
        purge_expired(&mut map, leader_key, now);
        if let Some(entry) = map.get_mut(leader_key) {
            // Only the owner's renewal refreshes the leader key, and only
            // its expiry — never the value.
            if entry.value == self_id {
                entry.expires_at = now + ttl;
            }
        }
        Ok(())
    }

    async fn try_acquire_or_confirm(
        &self,
        leader_key: &str,
        self_id: &str,
        ttl: Duration,
    ) -> Result<ClaimOutcome, MockStoreError> {
        self.apply_latency().await;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MockStoreError("store unreachable"));
        }
        let now = Instant::now();
        let mut map = self.entries.lock().unwrap();
        purge_expired(&mut map, leader_key, now);
        match map.get(leader_key) {
            Some(entry) if entry.value == self_id => Ok(ClaimOutcome::Confirmed),
            Some(entry) => Ok(ClaimOutcome::HeldBy(entry.value.clone())),
            None => {
                if self.deny_acquire.load(Ordering::SeqCst) {
                    return Ok(ClaimOutcome::Contended);
                }
                map.insert(
                    leader_key.to_string(),
                    MockEntry {
                        value: self_id.to_string(),
                        expires_at: now + ttl,
                    },
                );
                Ok(ClaimOutcome::Acquired)
            }
        }
    }
}
