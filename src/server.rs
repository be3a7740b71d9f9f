//! HTTP surface: a liveness page and the manual trigger.
//!
//! | Route | Behavior |
//! |-------|----------|
//! | `GET /` | Static "running" acknowledgment |
//! | `GET /run-now` | Runs one collection inline and blocks until it finishes |

use crate::collector::{Collector, RunOutcome, Trigger};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const HOME_MESSAGE: &str = "Deep-sea trend bot is running!";

pub fn router(collector: Arc<Collector>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/run-now", get(run_now))
        .with_state(collector)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

async fn home() -> &'static str {
    HOME_MESSAGE
}

async fn run_now(State(collector): State<Arc<Collector>>) -> Response {
    match collector.try_run(Trigger::Manual).await {
        Ok(RunOutcome::Completed(report)) => (
            StatusCode::OK,
            format!(
                "Manual run complete: {} records collected",
                report.collected
            ),
        )
            .into_response(),
        Ok(RunOutcome::Busy) => (
            StatusCode::CONFLICT,
            "A trend collection run is already in progress",
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Manual trend collection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Manual run failed: {e}"),
            )
                .into_response()
        }
    }
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
