use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the dispatcher.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default storage root holding the `sec/` directory.
pub const DEFAULT_ROOT_PATH: &str = ".";

/// Default service port; zero lets the transport pick one.
pub const DEFAULT_API_PORT: u16 = 0;

/// Default log filter expression used by the dispatcher.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default storage root.
#[must_use]
pub fn default_root_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_ROOT_PATH)
}

/// Default service port.
#[must_use]
pub fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}
