//! Layered configuration shared by the API dispatcher and its owning worker.
//!
//! Values are merged from built-in defaults, an optional configuration file,
//! `APIGATE_*` environment variables, and command-line flags, in increasing
//! order of precedence. Layering is provided by [`ortho_config`].
//!
//! The configuration carries the storage root under which the dispatcher
//! expects its security artefacts (`sec/acl.json` and `sec/acl.log`), the
//! logging setup, and the worker identity used to infer the API path and the
//! service announcements.

mod defaults;
mod logging;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_API_PORT, DEFAULT_LOG_FILTER, DEFAULT_ROOT_PATH, default_api_port,
    default_log_filter, default_log_filter_string, default_log_format, default_root_path,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for the API worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "APIGATE")]
pub struct Config {
    /// Storage root that contains the `sec/` directory.
    #[serde(default = "crate::defaults::default_root_path")]
    pub root_path: Utf8PathBuf,
    /// Tracing filter expression (for example `info` or `apigate=debug`).
    #[serde(default = "crate::defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "crate::defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Worker script name, such as `wrk.util.net.api.js`.
    #[serde(default)]
    pub worker: String,
    /// Port announced for the API service.
    #[serde(default = "crate::defaults::default_api_port")]
    pub api_port: u16,
    /// Service names announced alongside the API.
    ///
    /// Absent means "no list configured", which is distinct from an explicitly
    /// empty list.
    #[serde(default)]
    pub grc_services: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            worker: String::new(),
            api_port: default_api_port(),
            grc_services: None,
        }
    }
}

impl Config {
    /// Storage root containing the security artefacts.
    #[must_use]
    pub fn root_path(&self) -> &Utf8Path {
        self.root_path.as_path()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Structured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Worker script name.
    #[must_use]
    pub fn worker(&self) -> &str {
        self.worker.as_str()
    }

    /// Announced service port.
    #[must_use]
    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    /// Configured service announcements, if any.
    #[must_use]
    pub fn grc_services(&self) -> Option<&[String]> {
        self.grc_services.as_deref()
    }
}
