//! Metrics and observability infrastructure.
//!
//! - `events`: Internal event types and the `InternalEvent` trait
//! - `MetricsController`: process-wide Prometheus recorder with textfile export

pub mod events;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use snafu::prelude::*;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use crate::error::{
    AlreadyInitializedSnafu, MetricsError, NotInitializedSnafu, PrometheusInitSnafu, TextfileSnafu,
};

/// Macro for emitting metric events (Vector-style pattern).
///
/// # Example
///
/// ```ignore
/// use tributary_core::metrics::events::ObjectsListed;
///
/// emit!(ObjectsListed { count: 8 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

/// Histogram buckets for request durations (in seconds).
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

static CONTROLLER: OnceLock<MetricsController> = OnceLock::new();

/// Handle to the process-wide Prometheus recorder.
pub struct MetricsController {
    handle: PrometheusHandle,
}

/// Install the Prometheus recorder. Call once at startup.
pub fn init_global() -> Result<(), MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .install_recorder()
        .context(PrometheusInitSnafu)?;

    CONTROLLER
        .set(MetricsController { handle })
        .map_err(|_| AlreadyInitializedSnafu.build())
}

/// Initialize metrics for tests; safe to call from many test threads.
pub fn init_test() {
    if init_global().is_err() {
        while CONTROLLER.get().is_none() {
            std::hint::spin_loop();
        }
    }
}

impl MetricsController {
    /// Get the global controller.
    pub fn get() -> Result<&'static Self, MetricsError> {
        CONTROLLER.get().context(NotInitializedSnafu)
    }

    /// Render metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the current snapshot to `path` via a temp file and rename, so
    /// collectors never read a half-written file.
    pub fn write_textfile(&self, path: &Path) -> Result<(), MetricsError> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        std::fs::write(&tmp, self.render()).context(TextfileSnafu { path: &tmp })?;
        std::fs::rename(&tmp, path).context(TextfileSnafu { path })?;

        info!(path = %path.display(), "Wrote metrics textfile");
        Ok(())
    }
}
