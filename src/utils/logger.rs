//! Logging setup

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "warn,nbdrive=info";

/// Initialise the global tracing subscriber.
///
/// # Arguments
/// * `log_level` - filter directive (`debug`, `nbdrive=trace`, ...). When `None`,
///   `RUST_LOG` is used, then [`DEFAULT_FILTER`].
/// * `log_file` - optional file that receives a copy of every event
///
/// Console output goes to stderr so command output on stdout stays pipeable.
///
/// # Examples
/// ```no_run
/// use nbdrive::utils::logger::init_logger;
///
/// init_logger(Some("debug"), None).unwrap();
/// ```
pub fn init_logger(log_level: Option<&str>, log_file: Option<PathBuf>) -> Result<()> {
    let env_filter = build_filter(log_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(console::Term::stderr().features().colors_supported())
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(std::sync::Arc::new(file))
            .with_target(true)
            .with_ansi(false)
            .with_level(true);

        registry.with(file_layer).try_init()?;
    } else {
        registry.try_init()?;
    }

    tracing::debug!("Logger initialized");
    Ok(())
}

fn build_filter(log_level: Option<&str>) -> Result<EnvFilter> {
    Ok(match log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_is_parsed() {
        assert!(build_filter(Some("debug")).is_ok());
        assert!(build_filter(Some("nbdrive=trace,warn")).is_ok());
    }

    #[test]
    fn malformed_level_is_rejected() {
        assert!(build_filter(Some("nbdrive=notalevel")).is_err());
    }
}
