use uuid::Uuid;

/// Build this guard's instance ID: `<jobName>:<host>_<pid>_<token>`.
///
/// The ID doubles as the presence key in the store. Uniqueness comes from the
/// random token; host and pid are included purely so an operator can tell at
/// a glance which machine and process holds a key. A restarted process gets a
/// fresh token and therefore a fresh identity — a dead process's identity is
/// never resurrected as live.
pub fn instance_id(job_name: &str) -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    let pid = std::process::id();
    let token = Uuid::new_v4().simple();
    format!("{job_name}:{host}_{pid}_{token}")
}

/// Derive the leader key for a job: `<jobName>:last_run_server`.
///
/// Its value, when present, is the instance ID currently recognized as the
/// leader for that job.
pub fn leader_key(job_name: &str) -> String {
    format!("{job_name}:last_run_server")
}
