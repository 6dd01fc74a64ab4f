use contentcheck_classifiers::{ClassificationPipeline, ModelRegistry};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pipeline over the registry loaded at startup
    pub pipeline: ClassificationPipeline,

    /// Renders `/metrics`; absent when no recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            pipeline: ClassificationPipeline::new(registry),
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        self.pipeline.registry()
    }
}
