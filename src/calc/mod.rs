mod dto;
pub mod handlers;
pub mod model;
pub mod pricing;
pub mod report;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::calc_routes()
}
