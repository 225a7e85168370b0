use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::MetricsConfig;

/// Installs the global Prometheus recorder and exposes `/metrics` as an axum
/// route — mounted on the same router that serves the WebSocket upgrade
/// rather than a second listener, since this service has exactly one ingress
/// port to operate.
pub struct MetricsServer {
    handle: Arc<PrometheusHandle>,
}

impl MetricsServer {
    pub fn install(_cfg: MetricsConfig) -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(Self { handle: Arc::new(handle) })
    }

    pub fn route(&self) -> Router {
        Router::new().route("/metrics", get(render)).with_state(self.handle.clone())
    }
}

async fn render(State(handle): State<Arc<PrometheusHandle>>) -> String {
    handle.render()
}
