mod dto;
pub mod handlers;
pub(crate) mod repo;
pub mod repo_types;
pub mod schema;
pub mod services;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::snapshot_routes()
}
