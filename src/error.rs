use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

/// The single error taxonomy for the coordination core and its HTTP shell.
///
/// Every variant maps to exactly one status code; none of them carry JSON
/// bodies (only `/stats` responses do, and those are built separately as
/// `Json<...>`).
#[derive(thiserror::Error, Debug)]
pub enum BouncerError {
	#[error("invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("resource not found")]
	NotFound,

	#[error("wait deadline exceeded")]
	DeadlineExceeded,

	/// The client disconnected while suspended. Surfaced as a plain `408`
	/// like a deadline, but kept distinct internally so primitives never
	/// mistake it for a real timeout when updating stats — cancellations
	/// never move `timed_out`. In practice no client ever observes this
	/// response: the socket that would have read it is already gone.
	#[error("client disconnected while waiting")]
	Cancelled,

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl BouncerError {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::DeadlineExceeded | Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
			Self::Conflict(_) => StatusCode::CONFLICT,
			Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for BouncerError {
	fn into_response(self) -> Response<Body> {
		if let Self::Internal(ref msg) = self {
			tracing::error!(error = %msg, "internal error");
		}
		(self.status_code(), self.to_string()).into_response()
	}
}
