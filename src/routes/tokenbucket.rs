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
	maxwait: Option<u64>,
	interval: Option<u64>,
}

pub fn routes() -> Router<Arc<AppState>> {
	Router::new()
		.route("/tokenbucket/:name/acquire", get(acquire))
		.route("/tokenbucket/:name/stats", get(stats))
		.route("/tokenbucket/:name", delete(delete_bucket))
}

#[instrument(name = "tokenbucket_acquire", skip(state))]
pub async fn acquire(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<AcquireParams>) -> Result<StatusCode, BouncerError> {
	let Primitive::TokenBucket(bucket) = state.registry.get_or_create(Kind::TokenBucket, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	let cancel = state.shutdown.child_token();
	bucket.acquire(params.size, params.interval.unwrap_or(1000), dispatch::wait_policy(params.maxwait), &cancel).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "tokenbucket_stats", skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<Value>, BouncerError> {
	dispatch::stats(&state.registry, Kind::TokenBucket, &name)
}

#[instrument(name = "tokenbucket_delete", skip(state))]
pub async fn delete_bucket(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<StatusCode, BouncerError> {
	dispatch::delete(&state.registry, Kind::TokenBucket, &name)
}
