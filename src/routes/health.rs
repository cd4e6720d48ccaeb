use crate::AppState;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tracing::instrument;

pub fn routes() -> Router<Arc<AppState>> {
	Router::new().route("/.well-known/ready", get(ready))
}

#[instrument(name = "ready")]
pub async fn ready() -> StatusCode {
	StatusCode::OK
}
