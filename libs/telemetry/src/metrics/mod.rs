mod runtime;
mod system;
mod traits;

use std::{sync::Arc, time::Duration};

pub use system::SystemMetrics;
pub use traits::TelemetryMetrics;

use parking_lot::RwLock;
use runtime::Runtime;
use system::{System, SystemMetricsWrapper};

const REFRESH_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct Telemetry<M: TelemetryMetrics> {
    runtime: Arc<Runtime>,
    system: Arc<RwLock<System>>,
    metrics: Option<Arc<M>>,
}

impl<M: TelemetryMetrics> Telemetry<M> {
    pub fn new(metrics: Option<M>) -> Arc<Self> {
        Self::with_refresh_interval(metrics, REFRESH_INTERVAL)
    }

    pub fn with_refresh_interval(
        metrics: Option<M>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            runtime: Arc::new(Runtime::new(interval)),
            system: Arc::new(RwLock::new(System::new())),
            metrics: metrics.map(Arc::new),
        })
    }

    /// Start sampling host metrics in the background.
    pub fn start(&self) -> anyhow::Result<()> {
        let system = Arc::clone(&self.system);
        self.runtime.start(move || {
            system.write().refresh();
        })?;

        Ok(())
    }

    pub fn stop(&self) {
        self.runtime.stop();
    }

    pub fn base_metrics(&self) -> Option<M> {
        self.metrics.clone().and_then(|m| m.metrics())
    }

    pub fn maybe_use_metrics<F>(&self, f: F)
    where
        F: Fn(&M),
    {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }

    pub fn system_metrics(&self) -> anyhow::Result<SystemMetrics> {
        self.system.read().metrics()
    }

    pub fn get_metrics(&self) -> String {
        use prometheus::Encoder;

        let Some(metrics) = &self.metrics else {
            return "# EOF\n".to_string();
        };

        let mut result = metrics.gather_metrics();

        let mut buffer = Vec::new();
        if let Err(e) = prometheus::TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
        {
            tracing::error!("could not encode prometheus metrics: {}", e);
        }

        match String::from_utf8(buffer) {
            Ok(v) => result.push_str(&v),
            Err(e) => tracing::error!(
                "prometheus metrics could not be from_utf8'd: {}",
                e
            ),
        }

        // Not sampled yet right after startup, skip quietly.
        if let Ok(m) = self.system_metrics() {
            let wrapper = SystemMetricsWrapper::from(m);
            let labels: Vec<(&str, &str)> = vec![];
            match serde_prometheus::to_string(&wrapper, None, labels) {
                Ok(m) => result.push_str(&m),
                Err(err) => {
                    tracing::error!("could not encode system metrics: {:?}", err)
                }
            }
        }

        result.push_str("# EOF\n");
        result
    }
}
