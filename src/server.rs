use axum::Router;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Serve `app` until `signal` resolves, then drain.
///
/// Once the signal fires the listener stops accepting connections; in-flight
/// requests get up to `drain` to finish before they are dropped.
pub async fn serve_with_drain<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    drain: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let draining = Arc::new(Notify::new());
    let shutdown = {
        let draining = Arc::clone(&draining);
        async move {
            signal.await;
            draining.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .into_future();

    tokio::select! {
        result = server => result,
        _ = async {
            draining.notified().await;
            tokio::time::sleep(drain).await;
        } => {
            tracing::warn!(
                drain_secs = drain.as_secs(),
                "Drain window elapsed; dropping in-flight requests"
            );
            Ok(())
        }
    }
}
