//! Metrics HTTP endpoint: `/metrics` in Prometheus text format and a small
//! index page at `/`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use prometheus::Registry;
use tracing::error;

use rebalancer_core::metrics::render;

const INDEX_PAGE: &str = "<html>
<head><title>Ceph-Rebalancer</title></head>
<body>
<h1>Prometheus metrics for Ceph Rebalancer</h1>
<p><a href='/metrics'>Metrics</a></p>
</body>
</html>
";

pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .with_state(Arc::new(registry))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn metrics(State(registry): State<Arc<Registry>>) -> Result<String, StatusCode> {
    render(&registry).map_err(|e| {
        error!(error = %e, "cannot encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
