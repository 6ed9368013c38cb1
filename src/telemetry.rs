//! Logging setup for the `pix` binary.
//!
//! A non-empty `RUST_LOG` wins; otherwise the configured level (`--log-level` /
//! `PIX_LOG`) is used. Logs go to stderr so stdout stays clean for reports.
//! A bad filter is a usage error (exit code 2), whichever source it came from.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub fn init(log_level: &str) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(rust_log.as_deref(), log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| AppError::new(2, format!("failed to install log subscriber: {e}")))
}

fn log_filter(rust_log: Option<&str>, log_level: &str) -> Result<EnvFilter, AppError> {
    let (source, directives) = match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(env) => (EnvFilter::DEFAULT_ENV, env),
        None => ("--log-level", log_level),
    };
    EnvFilter::try_new(directives)
        .map_err(|e| AppError::new(2, format!("invalid log filter '{directives}' from {source}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_the_flag() {
        assert!(log_filter(Some("warn"), "pix=loud").is_ok());
        assert!(log_filter(Some("  "), "debug").is_ok());
        assert!(log_filter(None, "policy_index=debug,info").is_ok());
    }

    #[test]
    fn bad_filters_are_usage_errors() {
        let err = log_filter(None, "pix=loud").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("--log-level"));

        let err = log_filter(Some("pix=loud"), "info").unwrap_err();
        assert!(err.to_string().contains("RUST_LOG"));
    }
}
