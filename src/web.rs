use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum_server::Handle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{self, AppState};
use crate::config::ServerConfig;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Router with the API nested under `/api` and the server-wide layers
pub fn app(estimator: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(u64::from(config.request_timeout_seconds));

    Router::new().nest("/api", api::router(estimator)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ))
            // enforced by the `Json` extractor, which answers 413
            .layer(DefaultBodyLimit::max(
                config.body_limit_kb.saturating_mul(1024),
            )),
    )
}

pub async fn run(config: &ServerConfig, estimator: AppState) -> Result<()> {
    let app = app(estimator, config);
    let addr = resolve(&config.host, config.port).await?;

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) => serve_tls(addr, app, handle, cert, key).await,
        _ => {
            info!("Web server running at http://{}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .with_context(|| format!("Server on {addr} failed"))
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve {host}:{port}"))?
        .next()
        .ok_or_else(|| anyhow!("No address found for {host}:{port}"))
}

#[cfg(feature = "tls")]
async fn serve_tls(addr: SocketAddr, app: Router, handle: Handle, cert: &str, key: &str) -> Result<()> {
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert} / key {key}"))?;

    info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .with_context(|| format!("Server on {addr} failed"))
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(_addr: SocketAddr, _app: Router, _handle: Handle, _cert: &str, _key: &str) -> Result<()> {
    Err(anyhow!(
        "TLS certificate configured but this build lacks the `tls` feature"
    ))
}

async fn shutdown_on_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
