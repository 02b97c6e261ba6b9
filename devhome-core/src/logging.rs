//! Shared logging setup for the devhome binary.
//!
//! Logs go to stderr so JSON reports on stdout stay machine-readable.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Maps CLI verbosity flags to a tracing level.
///
/// `quiet` wins over any verbosity count.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes structured logging based on verbosity level.
///
/// A `RUST_LOG` directive, when present, overrides the level derived from
/// the flags.
///
/// # Example
/// ```rust,no_run
/// use devhome_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = level_for(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::DevhomeError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::level_for;

    // Logging can only be initialized once per test process, so only the
    // level mapping is exercised here.
    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::WARN),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "Failed for quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }
}
