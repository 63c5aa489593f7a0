use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::get,
    Extension, Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        capability::Capability,
        claims::Identity,
        extractors::{
            authorize, require_admin, require_session, AuthRejection, Authorized, RenewedAccess,
            RequestCredentials,
        },
    },
    state::AppState,
};

pub fn session_routes(state: &AppState) -> Router<AppState> {
    let session = Router::new()
        .route("/session", get(get_session))
        .route_layer(from_fn_with_state(state.clone(), require_session));
    let admin = Router::new()
        .route("/admin/session", get(get_session))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(session)
        .merge(admin)
        .route("/users/:name/session", get(get_owner_session))
}

#[instrument(skip_all)]
pub async fn get_session(Extension(identity): Extension<Identity>) -> Json<Identity> {
    info!(name = %identity.name, "session inspected");
    Json(identity)
}

#[instrument(skip(state, credentials))]
pub async fn get_owner_session(
    State(state): State<AppState>,
    Path(name): Path<String>,
    credentials: RequestCredentials,
) -> Result<(RenewedAccess, Json<Identity>), AuthRejection> {
    let Authorized { identity, renewal } =
        authorize(&state, &credentials, &Capability::OwnerOnly(name))?;
    Ok((renewal, Json(identity)))
}
