//! Tracing setup for hosts that want queryflow's structured events.
//!
//! The runner emits `tracing` events with pipeline name, collection, run id,
//! and stage count; this module installs a subscriber for binaries that have
//! not configured their own.

use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber with env-filter support.
///
/// Best-effort: returns `false` if a subscriber was already installed (for
/// example by the host application or a test harness), which leaves the
/// existing one in place.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_best_effort() {
        // Whichever call wins the race, the second must not panic.
        let _ = init_tracing();
        assert!(!init_tracing());
    }
}
