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
	maxwait: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SendParams {
	message: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
	Router::new()
		.route("/event/:name/wait", get(wait))
		.route("/event/:name/send", get(send))
		.route("/event/:name/stats", get(stats))
		.route("/event/:name", delete(delete_event))
}

#[instrument(name = "event_wait", skip(state))]
pub async fn wait(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<WaitParams>) -> Result<String, BouncerError> {
	let Primitive::Event(event) = state.registry.get_or_create(Kind::Event, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	let cancel = state.shutdown.child_token();
	event.wait(dispatch::wait_policy(params.maxwait), &cancel).await
}

#[instrument(name = "event_send", skip(state))]
pub async fn send(State(state): State<Arc<AppState>>, Path(name): Path<String>, Query(params): Query<SendParams>) -> StatusCode {
	let Primitive::Event(event) = state.registry.get_or_create(Kind::Event, &name) else {
		unreachable!("registry returns the kind it was asked to create")
	};
	event.send(params.message);
	StatusCode::NO_CONTENT
}

#[instrument(name = "event_stats", skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<Value>, BouncerError> {
	dispatch::stats(&state.registry, Kind::Event, &name)
}

#[instrument(name = "event_delete", skip(state))]
pub async fn delete_event(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<StatusCode, BouncerError> {
	dispatch::delete(&state.registry, Kind::Event, &name)
}
