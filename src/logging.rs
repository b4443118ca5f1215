//! Opt-in structured logging.
//!
//! Composition emits `tracing` events; this module wires up a subscriber for
//! applications that do not bring their own. Controlled by environment
//! variables:
//!
//! - `FILTER_LOGIC_DEBUG=true|1|yes` - enable debug logging
//! - `FILTER_LOGIC_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `FILTER_LOGIC_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! filter_logic::logging::init();
//! ```
//!
//! Without the `tracing-subscriber` feature, [`init`] is a no-op and events
//! go to whatever subscriber the application installed.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Whether `FILTER_LOGIC_DEBUG` requests debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("FILTER_LOGIC_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The configured log level.
///
/// `FILTER_LOGIC_LOG_LEVEL` wins; otherwise "debug" when debug is enabled,
/// "warn" when not.
pub fn log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("FILTER_LOGIC_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The configured log format, defaulting to "json".
pub fn log_format() -> &'static str {
    env::var("FILTER_LOGIC_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install a subscriber according to the environment. Call once at startup;
/// subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("FILTER_LOGIC_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = log_level();
            let filter = EnvFilter::try_new(format!("filter_logic={level}"))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match log_format() {
                "pretty" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
            }

            tracing::info!(level, format = log_format(), "logging initialized");
        }
    });
}
