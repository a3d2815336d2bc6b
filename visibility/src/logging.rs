//! Log setup shared by the command line tools.

use tracing_subscriber::EnvFilter;

/// Console verbosity selected by `-s` / `-v`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(silent: bool, verbose: bool) -> Self {
        match (silent, verbose) {
            (true, _) => Verbosity::Silent,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }

    pub fn default_directive(&self) -> &'static str {
        match self {
            Verbosity::Silent => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Install a stderr `fmt` subscriber. `RUST_LOG` overrides `verbosity`.
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_wins_over_verbose() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Silent);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::Verbose.default_directive(), "debug");
    }
}
