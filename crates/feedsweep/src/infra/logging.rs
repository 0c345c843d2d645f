//! Diagnostic output.
//!
//! Traces are a side channel: installing the subscriber may fail (another one
//! is already set) and that is never reported to the caller.

use tracing::Level;

pub fn init(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
