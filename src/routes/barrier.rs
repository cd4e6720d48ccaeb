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
pub struct WaitParams {
	size: u64,
	maxwait: Option<u64>,
}

pub fn routes() -> Router<Arc<AppState>> {
	Router::new()
		.route("/barrier/:name/wait", get(wait))
		.route("/barrier/:name/stats", get(stats))
		.route("/barrier/:name", delete(delete_barrier))
}

#[instrument(name = "barrier_wait", skip(state))]
pub async fn wait(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<WaitParams>) -> Result<StatusCode, BouncerError> {
	let Primitive::Barrier(barrier) = state.registry.get_or_create(Kind::Barrier, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	let cancel = state.shutdown.child_token();
	barrier.wait(params.size, dispatch::wait_policy(params.maxwait), &cancel).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "barrier_stats", skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<Value>, BouncerError> {
	dispatch::stats(&state.registry, Kind::Barrier, &name)
}

#[instrument(name = "barrier_delete", skip(state))]
pub async fn delete_barrier(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<StatusCode, BouncerError> {
	dispatch::delete(&state.registry, Kind::Barrier, &name)
}
