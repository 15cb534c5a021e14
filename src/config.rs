//! Logging configuration for embedding programs.
//!
//! The crate never installs a global subscriber itself — that stays the
//! host program's call. `LoggingConfig` and `init_tracing` exist so a binary
//! or example embedding this allocator can wire its diagnostics into its own
//! logging pipeline with one call.

use serde::{Deserialize, Serialize};

/// Logging verbosity/format for an embedding program to apply when it
/// installs a `tracing` subscriber that will receive this crate's events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Emit newline-delimited JSON instead of the default human-readable format.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json_format: false }
    }
}

/// Install a process-wide `tracing` subscriber honouring `config`.
///
/// Intended for binaries and examples (see `demos/basic_usage.rs`), not for
/// this library itself. Returns an error rather than panicking if a global
/// subscriber is already installed, since that is a perfectly recoverable
/// situation for the caller (e.g. a test harness that installs its own).
pub fn init_tracing(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json_format {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_info() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.level, "info");
        assert!(!cfg.json_format);
    }

    #[test]
    fn serializes_round_trip() {
        let cfg = LoggingConfig { level: "debug".to_string(), json_format: true };
        let encoded = serde_json::to_string(&cfg).unwrap();
        let decoded: LoggingConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.level, "debug");
        assert!(decoded.json_format);
    }
}
