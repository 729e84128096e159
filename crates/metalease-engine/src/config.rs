//! Engine configuration.

/// Configuration for the lease admission controller.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many times a commit-time conflict is retried with freshly
    /// fetched availabilities before surfacing to the caller
    /// (default: 1 — exactly one automatic retry, never a loop).
    pub admission_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admission_retries: 1,
        }
    }
}
