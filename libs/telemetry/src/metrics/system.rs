use serde::Serialize;
use sysinfo::{CpuExt, SystemExt};

/// Host-level gauges sampled by the telemetry refresher.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub total_memory_bytes: u64,
    pub used_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub cpu_usage_percent: f32,
    pub cpu_count: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, derive_more::From)]
pub struct SystemMetricsWrapper {
    system: SystemMetrics,
}

pub struct System {
    inner: sysinfo::System,
    refreshed: bool,
}

impl System {
    pub fn new() -> Self {
        Self {
            inner: sysinfo::System::new(),
            refreshed: false,
        }
    }

    pub fn refresh(&mut self) {
        self.inner.refresh_memory();
        self.inner.refresh_cpu();
        self.refreshed = true;
    }

    pub fn metrics(&self) -> anyhow::Result<SystemMetrics> {
        if !self.refreshed {
            anyhow::bail!("system metrics have not been sampled yet");
        }

        Ok(SystemMetrics {
            total_memory_bytes: self.inner.total_memory(),
            used_memory_bytes: self.inner.used_memory(),
            available_memory_bytes: self.inner.available_memory(),
            cpu_usage_percent: self.inner.global_cpu_info().cpu_usage(),
            cpu_count: self.inner.cpus().len(),
            uptime_seconds: self.inner.uptime(),
        })
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_require_a_refresh() {
        let mut system = System::new();
        assert!(system.metrics().is_err());

        system.refresh();
        let metrics = system.metrics().unwrap();
        assert!(metrics.total_memory_bytes >= metrics.used_memory_bytes);
    }
}
