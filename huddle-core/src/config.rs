use std::time::Duration;

/// The configuration of the coordination core.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long to wait before telling existing members about a newly joined
    /// peer. The new peer's transport needs this time to finish local media
    /// setup, otherwise calls towards it may be silently dropped.
    pub join_grace_in_seconds: f32,
    /// Bound on any one call to an external collaborator (store, AI).
    pub collaborator_timeout_in_seconds: f32,
}

impl Config {
    /// The join grace interval as a [Duration].
    pub fn join_grace(&self) -> Duration {
        Duration::from_secs_f32(self.join_grace_in_seconds)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.collaborator_timeout_in_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Enough for a typical client to finish local media setup
            join_grace_in_seconds: 1.0,
            // Local transcription and summarization can be slow, but not
            // unboundedly so
            collaborator_timeout_in_seconds: 60.0,
        }
    }
}
