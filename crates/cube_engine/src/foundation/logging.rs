//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`, defaulting to `info`
pub fn init() {
    init_with_filter("info");
}

/// Initialize the logging system with a fallback filter
///
/// `RUST_LOG` still wins when it is set. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init_with_filter(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
