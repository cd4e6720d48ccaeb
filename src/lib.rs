pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod keygen;
pub mod metrics;
pub mod primitives;
pub mod registry;
pub mod routes;
pub mod wait;

pub use config::Config;
pub use error::BouncerError;
pub use registry::Registry;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every route: the primitive registry and the
/// process-wide shutdown signal each request's own cancellation token is
/// derived from.
#[derive(Clone)]
pub struct AppState {
	pub registry: Arc<Registry>,
	pub shutdown: CancellationToken,
}

impl AppState {
	pub fn new(shutdown: CancellationToken) -> Self {
		Self {
			registry: Arc::new(Registry::new()),
			shutdown,
		}
	}
}
