use crate::dispatch;
use crate::error::BouncerError;
use crate::primitives::{Kind, Primitive};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

pub fn routes() -> Router<Arc<AppState>> {
	Router::new()
		.route("/counter/:name/count", get(count))
		.route("/counter/:name/value", get(value))
		.route("/counter/:name/reset", get(reset))
		.route("/counter/:name/stats", get(stats))
		.route("/counter/:name", delete(delete_counter))
}

#[instrument(name = "counter_count", skip(state))]
pub async fn count(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> String {
	let Primitive::Counter(counter) = state.registry.get_or_create(Kind::Counter, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	counter.count().to_string()
}

#[instrument(name = "counter_value", skip(state))]
pub async fn value(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> String {
	let Primitive::Counter(counter) = state.registry.get_or_create(Kind::Counter, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	counter.value().to_string()
}

#[instrument(name = "counter_reset", skip(state))]
pub async fn reset(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> StatusCode {
	let Primitive::Counter(counter) = state.registry.get_or_create(Kind::Counter, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	counter.reset();
	StatusCode::NO_CONTENT
}

#[instrument(name = "counter_stats", skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<Value>, BouncerError> {
	dispatch::stats(&state.registry, Kind::Counter, &name)
}

#[instrument(name = "counter_delete", skip(state))]
pub async fn delete_counter(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<StatusCode, BouncerError> {
	dispatch::delete(&state.registry, Kind::Counter, &name)
}
