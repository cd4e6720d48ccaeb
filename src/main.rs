use axum::{routing::get, Router};
use bouncer::{metrics, routes, AppState, Config};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{filter::EnvFilter, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	init_tracing(&config);

	let shutdown_token = CancellationToken::new();
	let app_state = Arc::new(AppState::new(shutdown_token.clone()));

	let metrics_app = Router::new().route("/metrics", get(metrics::metrics_handler)).with_state(app_state.registry.clone());
	let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
	let metrics_listener = TcpListener::bind(metrics_addr).await?;
	let metrics_server = tokio::spawn(async move {
		if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
			tracing::error!(error = %err, "metrics listener failed");
		}
	});

	let app = routes::all().with_state(app_state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(axum::middleware::from_fn(metrics::metrics_middleware)));

	let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
	let listener = TcpListener::bind(addr).await?;
	tracing::info!(%addr, "bouncer listening");

	let signal_token = shutdown_token.clone();
	let signal_task = tokio::spawn(async move {
		let _ = tokio::signal::ctrl_c().await;
		tracing::info!("received shutdown signal");
		signal_token.cancel();
	});

	let server = axum::serve(listener, app.into_make_service());
	tokio::select! {
		result = server => {
			if let Err(err) = result {
				tracing::error!(error = %err, "server error");
			}
		}
		() = shutdown_token.cancelled() => {
			tracing::info!("shutdown initiated");
		}
	}

	shutdown_token.cancel();
	tracing::info!(grace_secs = config.shutdown_grace_secs, "waiting for in-flight waiters to drain");
	tokio::time::sleep(Duration::from_secs(config.shutdown_grace_secs)).await;

	metrics_server.abort();
	signal_task.abort();
	tracing::info!("shutdown complete");
	Ok(())
}

fn init_tracing(config: &Config) {
	use tracing_subscriber::layer::SubscriberExt;

	let filter = EnvFilter::try_new(&config.loglevel).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_filter(filter)).init();
}
