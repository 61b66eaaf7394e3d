//! Logging setup and error reporting helpers.

use std::error::Error;

/// Initializes the tracing subscriber for logging.
///
/// Sets up a registry with an environment filter (`RUST_LOG`) and a
/// formatting layer. Call once at the start of an application.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Renders an error and every `source()` below it, outermost first.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\n  caused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
