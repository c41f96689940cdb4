use super::parse_json;
use crate::error::Result;
use crate::extract::Owner;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::UserUrl;
use snip_storage::DeleteTask;

/// `GET /api/user/urls`: the caller's live urls, or `204` when there are none.
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Response> {
    let records = state.storage().get_all_user_urls(owner.id()).await?;
    if records.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let urls: Vec<UserUrl> = records
        .iter()
        .map(|record| record.to_user_url(state.base_url()))
        .collect();
    Ok(Json(urls).into_response())
}

/// `DELETE /api/user/urls` with a JSON array of tokens.
///
/// Answers `202` as soon as the task is queued; the delete worker applies it later.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: Bytes,
) -> Result<StatusCode> {
    let tokens: Vec<String> = parse_json(&body)?;
    if !tokens.is_empty() {
        state
            .deletes()
            .submit(DeleteTask {
                tokens,
                owner_id: owner.0,
            })
            .await?;
    }
    Ok(StatusCode::ACCEPTED)
}
