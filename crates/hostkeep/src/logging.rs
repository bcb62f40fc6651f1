//! Diagnostics on stderr
//!
//! Console output on stdout is the operator's report; tracing events go to
//! stderr so the two never interleave in a pipe.

use tracing_subscriber::EnvFilter;

/// Level used when neither RUST_LOG nor the config says otherwise
pub const DEFAULT_LEVEL: &str = "warn";

/// Filter directives in effect; RUST_LOG wins over the configured level
pub fn directives(rust_log: Option<&str>, configured: &str) -> String {
    if let Some(env) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        return env.to_string();
    }
    match configured.trim() {
        "" => DEFAULT_LEVEL.to_string(),
        level => level.to_string(),
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init(configured: &str) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let wanted = directives(rust_log.as_deref(), configured);
    let filter = EnvFilter::try_new(&wanted).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_config() {
        assert_eq!(directives(Some("hostkeep_common=debug"), "info"), "hostkeep_common=debug");
    }

    #[test]
    fn test_config_level_used_without_env() {
        assert_eq!(directives(None, "info"), "info");
        assert_eq!(directives(Some("  "), "error"), "error");
    }

    #[test]
    fn test_empty_config_falls_back() {
        assert_eq!(directives(None, ""), DEFAULT_LEVEL);
    }
}
