#[derive(Debug)]
pub enum GuardError {
    /// The lease store could not be reached, or an operation timed out.
    /// Callers must treat leadership as undetermined and skip the tick.
    StoreUnavailable(String),
    InvalidConfig(String),
}

impl std::fmt::Display for GuardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(msg) => write!(f, "lease store unavailable: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid guard config: {msg}"),
        }
    }
}

impl std::error::Error for GuardError {}
