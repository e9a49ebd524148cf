//! Log setup for the command-line tool.
//!
//! Logs go to stderr so that resolved output on stdout stays clean.
//! `RUST_LOG` takes precedence over the verbosity flags.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map `-q`/`-v` counts to a level. Default is `warn`.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: u8, quiet: bool) {
    let level = level_for(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));

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
    fn test_level_for() {
        assert_eq!(level_for(0, false), Level::WARN);
        assert_eq!(level_for(1, false), Level::INFO);
        assert_eq!(level_for(2, false), Level::DEBUG);
        assert_eq!(level_for(5, false), Level::TRACE);
        assert_eq!(level_for(3, true), Level::ERROR);
    }

    #[test]
    fn test_init_twice() {
        init(0, false);
        init(2, false);
    }
}
