//! Adapter exposing a configured API worker to the dispatcher.
//!
//! The worker owns the storage root and announces the API to the service
//! registry. It only supplies a [`Context`] while started, so a dispatcher
//! built over it answers `ERR_API_READY` before [`ApiWorker::start`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::info;

use apigate_config::Config;

use crate::context::{Context, ContextProvider};

const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");

/// Script extension stripped from worker names.
const WORKER_EXTENSION: &str = ".js";

/// API module settings derived from the worker name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiConf {
    /// Dotted module path, such as `util.net`.
    pub path: String,
}

/// Service registry announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrcConf {
    /// Port announced for the API.
    pub svc_port: u16,
    /// Additional service names; `None` when no list is configured.
    pub services: Option<Vec<String>>,
}

/// Configured API worker.
#[derive(Debug)]
pub struct ApiWorker {
    config: Config,
    context: Arc<Context>,
    started: AtomicBool,
}

impl ApiWorker {
    /// Builds a stopped worker rooted at `config.root_path`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let context = Arc::new(Context::new(config.root_path()));
        Self {
            config,
            context,
            started: AtomicBool::new(false),
        }
    }

    /// Worker configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Module path inferred from the worker name.
    #[must_use]
    pub fn api_path(&self) -> String {
        infer_api_path(self.config.worker())
    }

    /// API module settings.
    #[must_use]
    pub fn api_conf(&self) -> ApiConf {
        ApiConf {
            path: self.api_path(),
        }
    }

    /// Service registry announcement for this worker.
    #[must_use]
    pub fn grc_conf(&self) -> GrcConf {
        GrcConf {
            svc_port: self.config.api_port(),
            services: self.config.grc_services().map(<[String]>::to_vec),
        }
    }

    /// Marks the worker ready to serve.
    pub fn start(&self) {
        if !self.started.swap(true, Ordering::AcqRel) {
            info!(
                target: WORKER_TARGET,
                root = %self.context.root_path(),
                api_path = %self.api_path(),
                svc_port = self.config.api_port(),
                "api worker started"
            );
        }
    }

    /// Withdraws the context until the next [`ApiWorker::start`].
    pub fn stop(&self) {
        if self.started.swap(false, Ordering::AcqRel) {
            info!(target: WORKER_TARGET, "api worker stopped");
        }
    }

    /// Returns `true` while the worker is started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

impl ContextProvider for ApiWorker {
    fn context(&self) -> Option<Arc<Context>> {
        self.is_started().then(|| Arc::clone(&self.context))
    }
}

/// Drops the directory, the script extension, and the first and last dot
/// segments of a worker name: `wrk.util.net.api.js` becomes `util.net`.
fn infer_api_path(worker: &str) -> String {
    let name = worker.rsplit(['/', '\\']).next().unwrap_or(worker);
    let name = name.strip_suffix(WORKER_EXTENSION).unwrap_or(name);
    let segments: Vec<&str> = name.split('.').collect();
    segments
        .get(1..segments.len().saturating_sub(1))
        .map(|inner| inner.join("."))
        .unwrap_or_default()
}
