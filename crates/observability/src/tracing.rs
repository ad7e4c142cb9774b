//! Tracing/logging initialization.
//!
//! The filter comes from `BILLBOOK_LOG`, then `RUST_LOG`, then `info`.
//! Output is JSON unless `BILLBOOK_LOG_FORMAT=pretty`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Filter directive to use given a variable lookup.
fn filter_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["BILLBOOK_LOG", "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let env = |key: &str| std::env::var(key).ok();
    let filter = EnvFilter::try_new(filter_directive(env))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match LogFormat::parse(env("BILLBOOK_LOG_FORMAT").as_deref()) {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
