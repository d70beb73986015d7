use crate::app::{AppState, InitError, Uploadforge};
use crate::constants::ENV_LOG_LEVEL;
use crate::handlers::{status_handler, upload_handler};
use crate::middleware;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{extract::Request, Router};
use axum_prometheus::PrometheusMetricLayer;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn generate_request_id() -> String {
    format!("{:010x}", rand::random::<u64>() & 0xff_ffff_ffff)
}

/// Install the global tracing subscriber, filtered by `UPLOADFORGE_LOG_LEVEL`.
pub fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_env(ENV_LOG_LEVEL))
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("Global tracing subscriber already set");
    }
}

/// Routes without the Prometheus layer, which installs a process-wide recorder.
pub fn router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.timeout);
    let body_limit = state.config.max_body_size;

    Router::new()
        .route("/status", get(status_handler))
        .route(
            "/upload",
            post(upload_handler)
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(axum::middleware::from_fn(middleware::status_code_metric_middleware)),
        )
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<axum::body::Body>| {
                let request_id = generate_request_id();
                info_span!(
                    "request",
                    id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(TimeoutLayer::new(timeout))
}

pub async fn start() -> Result<(), InitError> {
    init_tracing();

    let uploadforge = Uploadforge::from_env()?;
    let state = uploadforge.state();

    info!("Starting uploadforge server with {} workers...", state.config.workers);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    let main_metric_handle = metric_handle.clone();

    let app = router(state.clone())
        .route("/metrics", get(move || async move { main_metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = TcpListener::bind(&state.config.bind_address).await?;
    info!("Listening on http://{}", &state.config.bind_address);

    let main_server = axum::serve(listener, app);

    if let Some(prometheus_bind_address) = &state.config.prometheus_bind_address {
        match TcpListener::bind(prometheus_bind_address).await {
            Ok(prometheus_listener) => {
                info!(
                    "Prometheus metrics will be exposed on http://{}",
                    prometheus_bind_address
                );

                let prometheus_app =
                    Router::new().route("/metrics", get(move || async move { metric_handle.render() }));
                let prometheus_server = axum::serve(prometheus_listener, prometheus_app);

                tokio::select! {
                    result = main_server.into_future() => result?,
                    result = prometheus_server.into_future() => result?,
                }
            }
            Err(e) => {
                warn!(
                    "Failed to bind Prometheus to {}: {}. Prometheus metrics will not be available.",
                    prometheus_bind_address, e
                );
                main_server.await?;
            }
        }
    } else {
        main_server.await?;
    }

    Ok(())
}
