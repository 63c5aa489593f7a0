use crate::state::AppState;
use axum::Router;

pub mod capability;
pub mod claims;
pub mod codec;
pub mod extractors;
pub mod handlers;
pub mod pair;
pub mod renewal;
pub mod verifier;

pub fn router(state: &AppState) -> Router<AppState> {
    handlers::session_routes(state)
}
