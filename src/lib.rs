//! # cron-guard
//!
//! Sticky-leader execution guard for scheduled jobs deployed redundantly
//! across multiple process instances.
//!
//! Deploy the same job on N instances for availability; exactly one runs
//! each scheduled firing, with automatic failover when the current executor
//! dies. Coordination needs nothing beyond a shared key-value store with
//! conditional writes and key expiry — no coordinator process, no consensus.
//!
//! ## How it works
//!
//! - Each instance derives a unique identity (`<job>:<host>_<pid>_<token>`)
//!   that doubles as its presence key in the store.
//! - A background loop renews the presence key and, when this instance is
//!   the recognized leader, extends the leader key's TTL.
//! - On every scheduler tick the guard makes one atomic acquire-or-confirm
//!   call: leader → run the body; held elsewhere → skip silently; store
//!   unreachable → skip (fail closed — double execution is worse than a
//!   missed tick).
//! - Leadership is sticky: it changes hands only when the leader's lease
//!   expires, never by voluntary step-down.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cron_guard::{GuardConfig, GuardedJob, NatsLeaseStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let nats = async_nats::connect("nats://localhost:4222").await.unwrap();
//!     let js = async_nats::jetstream::new(nats);
//!
//!     let config = GuardConfig::new("report");
//!     let store = NatsLeaseStore::bootstrap(&js, &config).await.unwrap();
//!     let job = GuardedJob::new(store, config, || async {
//!         println!("running the nightly report");
//!     })
//!     .unwrap();
//!
//!     // The external scheduler invokes this at every computed tick;
//!     // only the current leader instance actually runs the body.
//!     job.run().await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod job;
pub mod kv;
pub mod nats_impls;
pub mod renewer;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use config::{DEFAULT_LEASE_TTL, GuardConfig};
pub use error::GuardError;
pub use guard::{GuardState, LeaderGuard};
pub use job::GuardedJob;
pub use nats_impls::NatsLeaseStore;
pub use renewer::PresenceRenewer;
pub use traits::{ClaimOutcome, LeaseStore};
