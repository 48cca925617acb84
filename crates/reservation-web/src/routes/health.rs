//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
}

/// Health check endpoint. Reports `degraded` when the database is unreachable.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let reachable = database::reservation::count_reservations(state.db.pool(), None)
        .await
        .is_ok();

    Json(Health {
        status: if reachable { "ok" } else { "degraded" }.to_string(),
    })
}
