use std::time::Duration;

use async_nats::jetstream::{self, kv};
use bytes::Bytes;

use crate::{
    config::GuardConfig,
    error::GuardError,
    kv::{get_or_create_lease_bucket, sanitize_key},
    traits::{ClaimOutcome, LeaseStore},
};

/// Concrete `LeaseStore` backed by a per-job NATS JetStream KV bucket.
///
/// Expiry is the bucket's `max_age`, set to the lease TTL at bootstrap, so
/// the per-call `ttl` argument is carried for contract parity but the server
/// applies the bucket-level value. `create` is the conditional set-if-absent;
/// `update` at a known revision is the owner-scoped refresh.
#[derive(Clone)]
pub struct NatsLeaseStore {
    store: kv::Store,
}

impl NatsLeaseStore {
    pub fn new(store: kv::Store) -> Self {
        Self { store }
    }

    /// Ensure the job's lease bucket exists and wrap it.
    pub async fn bootstrap(
        js: &jetstream::Context,
        config: &GuardConfig,
    ) -> Result<Self, GuardError> {
        let store = get_or_create_lease_bucket(js, config).await?;
        Ok(Self::new(store))
    }
}

impl LeaseStore for NatsLeaseStore {
    type Error = GuardError;

    async fn renew(
        &self,
        presence_key: &str,
        leader_key: &str,
        self_id: &str,
        _ttl: Duration,
    ) -> Result<(), GuardError> {
        let presence = sanitize_key(presence_key);
        self.store
            .put(presence, Bytes::from_static(b"1"))
            .await
            .map_err(|e| GuardError::StoreUnavailable(e.to_string()))?;

        let leader = sanitize_key(leader_key);
        match self.store.entry(leader.clone()).await {
            Ok(Some(entry))
                if entry.operation == kv::Operation::Put
                    && entry.value.as_ref() == self_id.as_bytes() =>
            {
                // Rewriting the value at its current revision resets the
                // entry's age.
                match self
                    .store
                    .update(leader.clone(), entry.value.clone(), entry.revision)
                    .await
                {
                    Ok(_revision) => Ok(()),
                    // A rejected update is either a wrong-revision bounce
                    // (ownership moved between the read and the refresh;
                    // the next tick's claim resolves it) or a connectivity
                    // failure that must surface. A re-read tells them
                    // apart: if the key still names this instance, the
                    // refresh genuinely failed.
                    Err(update_err) => match self.store.entry(leader).await {
                        Ok(Some(current))
                            if current.operation == kv::Operation::Put
                                && current.value.as_ref() == self_id.as_bytes() =>
                        {
                            Err(GuardError::StoreUnavailable(update_err.to_string()))
                        }
                        Ok(_) => Ok(()),
                        Err(e) => Err(GuardError::StoreUnavailable(e.to_string())),
                    },
                }
            }
            // Absent or held by someone else: renewal never touches it.
            Ok(_) => Ok(()),
            Err(e) => Err(GuardError::StoreUnavailable(e.to_string())),
        }
    }

    async fn try_acquire_or_confirm(
        &self,
        leader_key: &str,
        self_id: &str,
        _ttl: Duration,
    ) -> Result<ClaimOutcome, GuardError> {
        let leader = sanitize_key(leader_key);
        match self.store.entry(leader.clone()).await {
            Ok(Some(entry)) if entry.operation == kv::Operation::Put => {
                if entry.value.as_ref() == self_id.as_bytes() {
                    Ok(ClaimOutcome::Confirmed)
                } else {
                    Ok(ClaimOutcome::HeldBy(
                        String::from_utf8_lossy(&entry.value).into_owned(),
                    ))
                }
            }
            Ok(_) => {
                match self
                    .store
                    .create(leader, Bytes::copy_from_slice(self_id.as_bytes()))
                    .await
                {
                    Ok(_revision) => Ok(ClaimOutcome::Acquired),
                    Err(e) if e.kind() == kv::CreateErrorKind::AlreadyExists => {
                        Ok(ClaimOutcome::Contended)
                    }
                    Err(e) => Err(GuardError::StoreUnavailable(e.to_string())),
                }
            }
            Err(e) => Err(GuardError::StoreUnavailable(e.to_string())),
        }
    }
}
