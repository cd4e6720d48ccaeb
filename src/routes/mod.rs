pub mod barrier;
pub mod counter;
pub mod event;
pub mod health;
pub mod semaphore;
pub mod tokenbucket;
pub mod watchdog;

use crate::AppState;
use axum::Router;
use std::sync::Arc;

pub fn all() -> Router<Arc<AppState>> {
	Router::new()
		.merge(health::routes())
		.merge(tokenbucket::routes())
		.merge(semaphore::routes())
		.merge(event::routes())
		.merge(counter::routes())
		.merge(watchdog::routes())
		.merge(barrier::routes())
}
