//! Serve an [`Application`] over HTTP with graceful shutdown, grounded
//! in the teacher's `AppBuilder::serve`/`shutdown_signal`
//! (`r2e-core/src/builder.rs`).

use crate::router::build_router;
use std::net::SocketAddr;
use std::sync::Arc;
use taskwire_core::Application;

/// Bind `addr` and serve `app` until ctrl-c or SIGTERM.
pub async fn serve(app: Arc<Application>, addr: SocketAddr) -> std::io::Result<()> {
    let router = build_router(app);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "taskwire http transport listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await
}

/// Resolves on ctrl-c or, on unix, SIGTERM — whichever arrives first
/// (spec SPEC_FULL §2 "graceful shutdown").
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
