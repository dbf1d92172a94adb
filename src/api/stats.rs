//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::stats::{ClientHistory, ProviderStatistics},
    AppState,
};

use super::AuthenticatedUser;

/// Dashboard of the calling provider
#[utoipa::path(
    get,
    path = "/provider/statistics",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Provider statistics", body = ProviderStatistics),
        (status = 403, description = "Provider role required")
    )
)]
pub async fn provider_statistics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ProviderStatistics>> {
    let stats = state.services.stats.provider_statistics(&user.actor()).await?;
    Ok(Json(stats))
}

/// Appointment history and reward progress of the calling client
#[utoipa::path(
    get,
    path = "/client/statistics",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Client history", body = ClientHistory),
        (status = 403, description = "Client role required")
    )
)]
pub async fn client_statistics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ClientHistory>> {
    let history = state.services.stats.client_history(&user.actor()).await?;
    Ok(Json(history))
}
