//! Behavior tests for the sticky-leader guard, run against the in-memory
//! `MockLeaseStore` under a paused Tokio clock.
//!
//! `tokio::time::advance` drives lease expiry deterministically, so failover
//! timelines that take seconds of wall-clock in production run instantly
//! here. Tests that spawn a presence renewer yield between advances so the
//! background task observes each step.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cron_guard::{
    GuardConfig, GuardState, GuardedJob, LeaderGuard, LeaseStore, mocks::MockLeaseStore,
};

const TTL: Duration = Duration::from_secs(4);

fn config(job_name: &str) -> GuardConfig {
    GuardConfig::new(job_name).with_lease_ttl(TTL)
}

/// Let spawned tasks (presence renewers) run to quiescence.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn advance(d: Duration) {
    tokio::time::advance(d).await;
    settle().await;
}

/// A job body that counts its executions.
fn counting_body() -> (Arc<AtomicUsize>, impl Fn() -> std::future::Ready<()>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&count);
    let body = move || {
        counted.fetch_add(1, Ordering::SeqCst);
        std::future::ready(())
    };
    (count, body)
}

// ── Mutual exclusion ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn exactly_one_instance_acquires_leadership() {
    let store = MockLeaseStore::new();
    let a = LeaderGuard::new(store.clone(), config("report")).unwrap();
    let b = LeaderGuard::new(store.clone(), config("report")).unwrap();

    let states = [a.check().await, b.check().await];
    let leaders = states
        .iter()
        .filter(|s| **s == GuardState::Leader)
        .count();
    assert_eq!(leaders, 1, "exactly one instance may lead per tick");

    assert_eq!(
        store.current_leader(a.leader_key()).as_deref(),
        Some(a.instance_id()),
        "first claimant wins and is stored as the leader value"
    );
}

#[tokio::test(start_paused = true)]
async fn guarded_job_body_runs_on_exactly_one_instance() {
    let store = MockLeaseStore::new();
    let (count_a, body_a) = counting_body();
    let (count_b, body_b) = counting_body();

    let a = GuardedJob::new(store.clone(), config("report"), body_a).unwrap();
    let b = GuardedJob::new(store.clone(), config("report"), body_b).unwrap();

    a.run().await;
    b.run().await;

    assert_eq!(
        count_a.load(Ordering::SeqCst) + count_b.load(Ordering::SeqCst),
        1,
        "one tick, one execution across all instances"
    );
}

#[tokio::test(start_paused = true)]
async fn leadership_is_sticky_across_ticks() {
    let store = MockLeaseStore::new();
    let a = LeaderGuard::new(store.clone(), config("report")).unwrap();
    let b = LeaderGuard::new(store.clone(), config("report")).unwrap();

    assert_eq!(a.check().await, GuardState::Leader);
    for _ in 0..3 {
        assert_eq!(a.check().await, GuardState::Leader, "leader stays leader");
        assert_eq!(b.check().await, GuardState::NotLeader, "non-leader skips silently");
    }
}

#[tokio::test(start_paused = true)]
async fn lost_claim_race_resolves_to_not_leader() {
    let store = MockLeaseStore::new();
    store.deny_acquire();
    let guard = LeaderGuard::new(store.clone(), config("report")).unwrap();

    // Contention is a normal outcome, not a store failure.
    assert_eq!(guard.check().await, GuardState::NotLeader);
}

// ── Failover ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn surviving_instance_takes_over_after_lease_expiry() {
    let store = MockLeaseStore::new();
    let a = LeaderGuard::new(store.clone(), config("report")).unwrap();
    let b = LeaderGuard::new(store.clone(), config("report")).unwrap();

    assert_eq!(a.check().await, GuardState::Leader);
    assert_eq!(b.check().await, GuardState::NotLeader);

    // A stops renewing (no renewer was started); its lease lapses.
    advance(TTL + Duration::from_millis(10)).await;

    assert_eq!(
        b.check().await,
        GuardState::Leader,
        "first tick after expiry claims the vacant slot"
    );
    assert_eq!(
        store.current_leader(b.leader_key()).as_deref(),
        Some(b.instance_id())
    );
}

/// The two-instance timeline: A and B share a job, A leads and renews, A is
/// killed at t=5s, its lease (last refreshed ~t=4s) lapses at ~t=8s, and B's
/// next tick takes over.
#[tokio::test(start_paused = true)]
async fn two_instance_timeline_with_failover() {
    let store = MockLeaseStore::new();
    let (count_a, body_a) = counting_body();
    let (count_b, body_b) = counting_body();

    let a = GuardedJob::new(store.clone(), config("report"), body_a).unwrap();
    let b = GuardedJob::new(store.clone(), config("report"), body_b).unwrap();
    settle().await; // first renewals fire immediately

    // t=0: tick on both; exactly one (A — it ticks first) runs.
    a.run().await;
    b.run().await;
    assert_eq!(count_a.load(Ordering::SeqCst), 1);
    assert_eq!(count_b.load(Ordering::SeqCst), 0);

    // t=1..4: A keeps leading; its renewer refreshes the lease underneath.
    for _ in 0..4 {
        advance(Duration::from_secs(1)).await;
        assert_eq!(a.run().await, GuardState::Leader);
        assert_eq!(b.run().await, GuardState::NotLeader);
    }
    assert_eq!(count_a.load(Ordering::SeqCst), 5);
    assert_eq!(count_b.load(Ordering::SeqCst), 0);

    // t=5: A dies — dropping the job aborts its renewal loop.
    advance(Duration::from_secs(1)).await;
    drop(a);

    // t=8.01: A's last refresh was at t=4 with a 4s TTL, so the slot is
    // vacant; B's next tick claims it.
    advance(Duration::from_secs(3) + Duration::from_millis(10)).await;
    assert_eq!(b.run().await, GuardState::Leader);
    assert_eq!(count_b.load(Ordering::SeqCst), 1);
    assert_eq!(count_a.load(Ordering::SeqCst), 5, "dead instance ran nothing more");
}

#[tokio::test(start_paused = true)]
async fn presence_renewer_keeps_leadership_alive() {
    let store = MockLeaseStore::new();
    let (_count, body) = counting_body();
    let a = GuardedJob::new(store.clone(), config("report"), body).unwrap();
    settle().await;

    assert_eq!(a.run().await, GuardState::Leader);

    // Well past the TTL — but the renewal loop has been refreshing the
    // leader key every TTL/2, so a newcomer still defers.
    for _ in 0..6 {
        advance(Duration::from_secs(1)).await;
    }
    let b = LeaderGuard::new(store.clone(), config("report")).unwrap();
    assert_eq!(b.check().await, GuardState::NotLeader);
    assert_eq!(
        store.current_leader(b.leader_key()).as_deref(),
        Some(a.instance_id())
    );
}

// ── Renewal semantics ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn renewal_never_originates_a_claim() {
    let store = MockLeaseStore::new();
    let guard = LeaderGuard::new(store.clone(), config("report")).unwrap();

    // Pure renewal against an empty store: presence appears, leader does not.
    store
        .renew(guard.instance_id(), guard.leader_key(), guard.instance_id(), TTL)
        .await
        .unwrap();

    assert!(store.contains_live(guard.instance_id()), "presence key written");
    assert_eq!(
        store.current_leader(guard.leader_key()),
        None,
        "an idle instance must not be granted leadership by its renewal loop"
    );
}

#[tokio::test(start_paused = true)]
async fn owner_renewal_refreshes_ttl_without_changing_value() {
    let store = MockLeaseStore::new();
    let a = LeaderGuard::new(store.clone(), config("report")).unwrap();
    assert_eq!(a.check().await, GuardState::Leader);

    // Renew every second for twice the TTL; the lease must survive solely on
    // refreshes and the stored value must never change.
    for _ in 0..8 {
        advance(Duration::from_secs(1)).await;
        store
            .renew(a.instance_id(), a.leader_key(), a.instance_id(), TTL)
            .await
            .unwrap();
        assert_eq!(
            store.current_leader(a.leader_key()).as_deref(),
            Some(a.instance_id())
        );
    }
}

#[tokio::test(start_paused = true)]
async fn non_owner_renewal_does_not_extend_foreign_lease() {
    let store = MockLeaseStore::new();
    let a = LeaderGuard::new(store.clone(), config("report")).unwrap();
    let b = LeaderGuard::new(store.clone(), config("report")).unwrap();
    assert_eq!(a.check().await, GuardState::Leader);

    // Only B renews. A's lease must still lapse on schedule.
    for _ in 0..5 {
        advance(Duration::from_secs(1)).await;
        store
            .renew(b.instance_id(), b.leader_key(), b.instance_id(), TTL)
            .await
            .unwrap();
    }
    assert_eq!(store.current_leader(a.leader_key()), None);
}

#[tokio::test(start_paused = true)]
async fn renewer_survives_store_outage() {
    let store = MockLeaseStore::new();
    let (_count, body) = counting_body();
    let job = GuardedJob::new(store.clone(), config("report"), body).unwrap();
    settle().await;
    assert!(store.contains_live(job.instance_id()), "first renewal fires immediately");

    // Outage spanning several renew intervals: every renewal attempt fails
    // and the presence key lapses.
    store.set_unavailable();
    for _ in 0..3 {
        advance(Duration::from_secs(2)).await;
    }
    assert!(
        !store.contains_live(job.instance_id()),
        "presence expires while the store is unreachable"
    );

    // The loop must have kept retrying: one interval after recovery the
    // presence key is back.
    store.set_available();
    advance(Duration::from_secs(2)).await;
    assert!(
        store.contains_live(job.instance_id()),
        "renewal loop survived the outage and resumed"
    );
}

// ── Restart identity ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn restarted_instance_must_reacquire_through_claim_path() {
    let store = MockLeaseStore::new();
    let old = LeaderGuard::new(store.clone(), config("report")).unwrap();
    assert_eq!(old.check().await, GuardState::Leader);
    let old_id = old.instance_id().to_string();
    drop(old);

    // "Restart": a new guard for the same job gets a fresh token, so the
    // stale leader value never matches it.
    let restarted = LeaderGuard::new(store.clone(), config("report")).unwrap();
    assert_ne!(restarted.instance_id(), old_id);
    assert_eq!(
        restarted.check().await,
        GuardState::NotLeader,
        "stale lease still owns the slot"
    );

    advance(TTL + Duration::from_millis(10)).await;
    assert_eq!(restarted.check().await, GuardState::Leader);
    assert_eq!(
        store.current_leader(restarted.leader_key()).as_deref(),
        Some(restarted.instance_id())
    );
}

#[tokio::test(start_paused = true)]
async fn wrappers_in_one_process_use_distinct_presence_keys() {
    let store = MockLeaseStore::new();
    let (_ca, body_a) = counting_body();
    let (_cb, body_b) = counting_body();
    let a = GuardedJob::new(store.clone(), config("report"), body_a).unwrap();
    let b = GuardedJob::new(store.clone(), config("report"), body_b).unwrap();
    settle().await;

    assert_ne!(a.instance_id(), b.instance_id());
    assert!(store.contains_live(a.instance_id()));
    assert!(store.contains_live(b.instance_id()));
}

// ── Fail closed ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn store_outage_never_authorizes_execution() {
    let store = MockLeaseStore::new();
    let (count, body) = counting_body();
    let job = GuardedJob::new(store.clone(), config("report"), body).unwrap();

    store.set_unavailable();
    for _ in 0..3 {
        assert_eq!(job.run().await, GuardState::Undetermined);
    }
    assert_eq!(count.load(Ordering::SeqCst), 0, "no tick runs during an outage");

    // Connectivity returns; the next tick resolves normally.
    store.set_available();
    assert_eq!(job.run().await, GuardState::Leader);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn outage_mid_tenure_fails_closed_until_recovery() {
    let store = MockLeaseStore::new();
    let a = LeaderGuard::new(store.clone(), config("report")).unwrap();
    assert_eq!(a.check().await, GuardState::Leader);

    store.set_unavailable();
    assert_eq!(
        a.check().await,
        GuardState::Undetermined,
        "even the current leader skips when it cannot confirm"
    );

    store.set_available();
    assert_eq!(a.check().await, GuardState::Leader);
}

#[tokio::test(start_paused = true)]
async fn slow_store_trips_op_timeout_and_fails_closed() {
    let store = MockLeaseStore::new();
    let guard = LeaderGuard::new(store.clone(), config("report")).unwrap();

    // Far beyond the op timeout (TTL/4 = 1s): the call is abandoned, the
    // tick is skipped, and the scheduler is never stalled.
    store.set_latency(Duration::from_secs(30));
    assert_eq!(guard.check().await, GuardState::Undetermined);

    store.clear_latency();
    assert_eq!(guard.check().await, GuardState::Leader);
}

// ── Job isolation ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unrelated_jobs_elect_independent_leaders() {
    let store = MockLeaseStore::new();
    let report = LeaderGuard::new(store.clone(), config("report")).unwrap();
    let cleanup = LeaderGuard::new(store.clone(), config("cleanup")).unwrap();

    assert_eq!(report.check().await, GuardState::Leader);
    assert_eq!(
        cleanup.check().await,
        GuardState::Leader,
        "distinct job names never contend for the same key"
    );
    assert_ne!(report.leader_key(), cleanup.leader_key());
}
