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
pub struct AcquireParams {
	size: u64,
	expires: Option<u64>,
	maxwait: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseParams {
	key: String,
}

pub fn routes() -> Router<Arc<AppState>> {
	Router::new()
		.route("/semaphore/:name/acquire", get(acquire))
		.route("/semaphore/:name/release", get(release))
		.route("/semaphore/:name/stats", get(stats))
		.route("/semaphore/:name", delete(delete_semaphore))
}

#[instrument(name = "semaphore_acquire", skip(state))]
pub async fn acquire(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<AcquireParams>) -> Result<String, BouncerError> {
	let Primitive::Semaphore(semaphore) = state.registry.get_or_create(Kind::Semaphore, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	let cancel = state.shutdown.child_token();
	semaphore.acquire(params.size, params.expires, dispatch::wait_policy(params.maxwait), &cancel).await
}

#[instrument(name = "semaphore_release", skip(state))]
pub async fn release(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<ReleaseParams>) -> Result<StatusCode, BouncerError> {
	let Primitive::Semaphore(semaphore) = state.registry.get_or_create(Kind::Semaphore, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	semaphore.release(&params.key)?;
	Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "semaphore_stats", skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<Value>, BouncerError> {
	dispatch::stats(&state.registry, Kind::Semaphore, &name)
}

#[instrument(name = "semaphore_delete", skip(state))]
pub async fn delete_semaphore(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<StatusCode, BouncerError> {
	dispatch::delete(&state.registry, Kind::Semaphore, &name)
}
