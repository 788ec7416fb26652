use tokio::signal;

/// Resolves on Ctrl+C (or SIGTERM on unix) so axum can drain connections.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            #[cfg(not(windows))]
            println!();
            tracing::info!("Ctrl+C recieved. Please wait, this could take a while.");
        }
        _ = terminate => {
            tracing::info!("SIGTERM recieved, shutting down.");
        }
    }
}
