use crate::error::Result;
use crate::model::StatsResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let urls = state.storage().count_urls().await?;
    let users = state.storage().count_users().await?;
    Ok(Json(StatsResponse { urls, users }))
}
