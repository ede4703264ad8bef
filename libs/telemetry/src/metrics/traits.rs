use prometheus::{Encoder, Registry, TextEncoder};
use rand::Rng;

/// A service-specific set of Prometheus collectors living in its own registry.
pub trait TelemetryMetrics: Clone + Send + Sync + 'static {
    fn registry(&self) -> &Registry;

    fn metrics(&self) -> Option<Self>;

    /// Encode everything in [`TelemetryMetrics::registry`] in the text format.
    fn gather_metrics(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) =
            TextEncoder::new().encode(&self.registry().gather(), &mut buffer)
        {
            tracing::error!("could not encode service metrics: {}", e);
            return String::default();
        }

        String::from_utf8(buffer).unwrap_or_else(|e| {
            tracing::error!("service metrics could not be from_utf8'd: {}", e);
            String::default()
        })
    }

    /// A lowercase prefix so several registries can live in one process.
    fn generate_random_prefix() -> String
    where
        Self: Sized,
    {
        let mut rng = rand::rng();
        (0..8).map(|_| rng.random_range(b'a'..=b'z') as char).collect()
    }
}
