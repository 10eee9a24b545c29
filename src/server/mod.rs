//! HTTP surface.
//!
//! `GET /` refreshes the telemetry and answers with the snapshot as JSON,
//! `GET /reload` re-enumerates the hardware, and `GET /exit` stops the server.
//! Requests that touch the telemetry are serialized by its mutex.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::telemetry::{Snapshot, Telemetry};
use crate::error::Result;

#[derive(Clone)]
pub struct AppState {
    telemetry: Arc<Mutex<Telemetry>>,
    shutdown: CancellationToken,
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    sensors: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/reload", get(reload))
        .route("/exit", get(exit))
        .fallback(not_found)
        .with_state(state)
}

async fn get_snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    let mut telemetry = state.telemetry.lock().await;
    Json(telemetry.refresh())
}

async fn reload(State(state): State<AppState>) -> Response {
    let mut telemetry = state.telemetry.lock().await;
    match telemetry.reload() {
        Ok(sensors) => Json(ReloadResponse { sensors }).into_response(),
        Err(e) => {
            log::error!("Reload failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn exit(State(state): State<AppState>) -> StatusCode {
    log::info!("Exit requested");
    state.shutdown.cancel();
    StatusCode::OK
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// A bound telemetry server
pub struct Server {
    listener: TcpListener,
    state: AppState,
    grace: Duration,
}

impl Server {
    pub async fn bind(addr: &str, telemetry: Telemetry, grace: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, telemetry, grace))
    }

    pub fn from_listener(listener: TcpListener, telemetry: Telemetry, grace: Duration) -> Self {
        Self {
            listener,
            state: AppState {
                telemetry: Arc::new(Mutex::new(telemetry)),
                shutdown: CancellationToken::new(),
            },
            grace,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops the server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Serve until shut down, then close the telemetry
    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            state,
            grace,
        } = self;

        log::info!("Server started on http://{}/", listener.local_addr()?);

        let telemetry = Arc::clone(&state.telemetry);
        let shutdown = state.shutdown.clone();
        let app = router(state);

        let serving = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });

        serve_then_close(serving, &telemetry, grace).await
    }
}

/// Drive `serving` to completion, then close the telemetry whatever it returned
async fn serve_then_close<F>(
    serving: F,
    telemetry: &Mutex<Telemetry>,
    grace: Duration,
) -> Result<()>
where
    F: IntoFuture<Output = std::io::Result<()>>,
{
    let served = serving.await;
    if let Err(e) = &served {
        log::error!("Server failed: {}", e);
    }

    telemetry.lock().await.close(grace).await;
    log::info!("Server stopped");
    served?;
    Ok(())
}
