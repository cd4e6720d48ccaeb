use crate::dispatch;
use crate::error::BouncerError;
use crate::primitives::{Kind, Primitive};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct KickParams {
	expires: u64,
}

#[derive(Debug, Deserialize)]
pub struct WaitParams {
	maxwait: Option<u64>,
}

pub fn routes() -> Router<Arc<AppState>> {
	Router::new()
		.route("/watchdog/:name/kick", get(kick))
		.route("/watchdog/:name/wait", get(wait))
		.route("/watchdog/:name/stats", get(stats))
		.route("/watchdog/:name", delete(delete_watchdog))
}

#[instrument(name = "watchdog_kick", skip(state))]
pub async fn kick(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<KickParams>) -> StatusCode {
	let Primitive::Watchdog(watchdog) = state.registry.get_or_create(Kind::Watchdog, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	watchdog.kick(params.expires);
	StatusCode::NO_CONTENT
}

#[instrument(name = "watchdog_wait", skip(state))]
pub async fn wait(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<WaitParams>) -> Result<StatusCode, BouncerError> {
	let Primitive::Watchdog(watchdog) = state.registry.get_or_create(Kind::Watchdog, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	let cancel = state.shutdown.child_token();
	watchdog.wait(dispatch::wait_policy(params.maxwait), &cancel).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "watchdog_stats", skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<Value>, BouncerError> {
	dispatch::stats(&state.registry, Kind::Watchdog, &name)
}

#[instrument(name = "watchdog_delete", skip(state))]
pub async fn delete_watchdog(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<StatusCode, BouncerError> {
	dispatch::delete(&state.registry, Kind::Watchdog, &name)
}
