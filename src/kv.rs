use async_nats::jetstream::{self, kv};

use crate::{config::GuardConfig, error::GuardError};

pub const LEASE_BUCKET_PREFIX: &str = "cron_guard_";

/// Bucket holding both lease keys for one job. Per-job buckets let each job
/// carry its own `max_age` (the lease TTL).
pub fn lease_bucket_name(job_name: &str) -> String {
    format!("{LEASE_BUCKET_PREFIX}{}", sanitize(job_name, false))
}

/// Map a logical key to the NATS KV key charset.
///
/// Logical keys use the `<jobName>:...` format, but NATS KV keys cannot
/// contain `:` (bucket names are stricter still). The mapping is
/// deterministic — every instance of a job derives the same leader key, so
/// they all collide on the same store key, which is the point — and
/// injective, so distinct job names can never merge into one election.
pub fn sanitize_key(logical: &str) -> String {
    sanitize(logical, true)
}

fn sanitize(logical: &str, allow_key_extras: bool) -> String {
    let mut out = String::with_capacity(logical.len());
    for b in logical.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => out.push(b as char),
            b'.' | b'/' | b'=' if allow_key_extras => out.push(b as char),
            // `_` doubles as the escape introducer, so literal underscores
            // are doubled to keep the mapping injective: after a `_`, a
            // second `_` is a literal and two hex digits are an escaped
            // byte, and the two can never be confused.
            b'_' => out.push_str("__"),
            _ => {
                out.push('_');
                out.push_str(&format!("{b:02x}"));
            }
        }
    }
    out
}

/// Get or create the per-job lease bucket with `max_age` = lease TTL.
///
/// Keys in the bucket that go unwritten for a full TTL are purged by the
/// server; that purge is the store-native expiry the whole lease protocol
/// rests on.
pub async fn get_or_create_lease_bucket(
    js: &jetstream::Context,
    config: &GuardConfig,
) -> Result<kv::Store, GuardError> {
    let name = lease_bucket_name(&config.job_name);
    let kv_config = kv::Config {
        bucket: name.clone(),
        history: 1,
        max_age: config.lease_ttl,
        ..Default::default()
    };
    match js.create_key_value(kv_config).await {
        Ok(store) => Ok(store),
        Err(_) => js
            .get_key_value(&name)
            .await
            .map_err(|e| GuardError::StoreUnavailable(e.to_string())),
    }
}
