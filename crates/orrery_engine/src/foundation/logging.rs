//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize logging with a default level that `RUST_LOG` can still override.
///
/// Returns `false` when a logger was already installed.
pub fn init_with_level(level: log::LevelFilter) -> bool {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .parse_default_env()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialization_is_refused() {
        init_with_level(log::LevelFilter::Debug);
        assert!(!init_with_level(log::LevelFilter::Info));
    }
}
