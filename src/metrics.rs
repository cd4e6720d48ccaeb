//! Prometheus metrics exposition, following the same `lazy_static` registry
//! + tower middleware shape used elsewhere for HTTP instrumentation.

use crate::registry::Registry;
use axum::{
	body::Body,
	extract::State,
	http::{Request, Response, StatusCode},
	middleware::Next,
};
use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

lazy_static! {
	static ref HTTP_REQUESTS_TOTAL: IntCounterVec =
		register_int_counter_vec!("bouncer_http_requests_total", "Total number of HTTP requests", &["method", "route", "status"]).expect("failed to register bouncer_http_requests_total");
	static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
		"bouncer_http_request_duration_seconds",
		"HTTP request duration in seconds",
		&["method", "route"]
	)
	.expect("failed to register bouncer_http_request_duration_seconds");
	static ref WAITERS_SUSPENDED: IntCounterVec =
		register_int_counter_vec!("bouncer_waiters_suspended_total", "Total waiters that ever suspended on a primitive", &["kind"]).expect("failed to register bouncer_waiters_suspended_total");
	static ref PRIMITIVES_TOTAL: IntGauge =
		register_int_gauge!("bouncer_primitives_total", "Distinct (kind, name) resources currently held in the registry").expect("failed to register bouncer_primitives_total");
}

pub fn record_suspended_waiter(kind: &str) {
	WAITERS_SUSPENDED.with_label_values(&[kind]).inc();
}

pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response<Body> {
	let method = req.method().to_string();
	let route = normalize_path(req.uri().path());

	let start = Instant::now();
	let response = next.run(req).await;
	let duration = start.elapsed().as_secs_f64();

	let status = response.status().as_u16().to_string();
	HTTP_REQUESTS_TOTAL.with_label_values(&[&method, &route, &status]).inc();
	HTTP_REQUEST_DURATION.with_label_values(&[&method, &route]).observe(duration);

	response
}

fn normalize_path(path: &str) -> String {
	path.trim_end_matches('/').split('?').next().unwrap_or("/").to_string()
}

pub async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Result<String, StatusCode> {
	PRIMITIVES_TOTAL.set(registry.len() as i64);

	let encoder = TextEncoder::new();
	let metric_families = prometheus::gather();
	let mut buffer = Vec::new();

	if encoder.encode(&metric_families, &mut buffer).is_err() {
		return Err(StatusCode::INTERNAL_SERVER_ERROR);
	}

	String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
