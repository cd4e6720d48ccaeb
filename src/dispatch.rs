//! Binds a resource kind/name/operation to the registry and shapes the
//! typed HTTP response. Individual route handlers in `crate::routes` parse
//! their own query parameters and call straight into these helpers, which
//! are shared across every kind for the two uniform operations (`stats`,
//! `delete`) and for deriving a wait policy from `maxwait`.

use crate::error::BouncerError;
use crate::primitives::Kind;
use crate::registry::Registry;
use crate::wait::WaitPolicy;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

/// `GET /{kind}/{name}/stats` — `404` if the resource was never touched.
pub fn stats(registry: &Registry, kind: Kind, name: &str) -> Result<Json<Value>, BouncerError> {
	let primitive = registry.get(kind, name)?;
	Ok(Json(primitive.stats_json()))
}

/// `DELETE /{kind}/{name}` — `404` if the resource was never touched.
pub fn delete(registry: &Registry, kind: Kind, name: &str) -> Result<StatusCode, BouncerError> {
	registry.delete(kind, name)?;
	Ok(StatusCode::NO_CONTENT)
}

pub fn wait_policy(maxwait: Option<u64>) -> WaitPolicy {
	WaitPolicy::from_maxwait_ms(maxwait)
}
