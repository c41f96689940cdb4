use super::parse_json;
use crate::error::Result;
use crate::extract::Owner;
use crate::model::{BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use snip_core::{StorageError, Token};
use tracing::debug;

const DEFAULT_SCHEME: &str = "http://";

/// `POST /` with the url as a plain-text body.
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: String,
) -> Result<Response> {
    let (status, token) = shorten(&state, body.trim(), &owner).await?;
    Ok((
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.short_url(&token),
    )
        .into_response())
}

/// `POST /api/shorten` with `{"url": ...}`.
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: Bytes,
) -> Result<Response> {
    let request: ShortenRequest = parse_json(&body)?;
    let (status, token) = shorten(&state, request.url.trim(), &owner).await?;
    let response = ShortenResponse {
        result: state.short_url(&token),
    };
    Ok((status, Json(response)).into_response())
}

/// `POST /api/shorten/batch`. Urls that are already shortened come back with
/// their existing short url; the batch as a whole is still `201 Created`.
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: Bytes,
) -> Result<Response> {
    let request: Vec<BatchRequestItem> = parse_json(&body)?;
    let urls: Vec<String> = request
        .iter()
        .map(|item| item.original_url.trim().to_owned())
        .collect();

    let items = state.storage().insert_urls(&urls, owner.id()).await?;
    let response: Vec<BatchResponseItem> = request
        .into_iter()
        .zip(items)
        .map(|(req, item)| BatchResponseItem {
            correlation_id: req.correlation_id,
            short_url: state.short_url(&item.token),
        })
        .collect();

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// `GET /{token}`: redirects to the original url.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect> {
    let url = state.storage().get_full_url(&token).await?;
    debug!(%token, %url, "redirecting");
    Ok(Redirect::temporary(&with_scheme(&url)))
}

async fn shorten(state: &AppState, url: &str, owner: &Owner) -> Result<(StatusCode, Token)> {
    match state.storage().insert_url(url, owner.id()).await {
        Ok(token) => Ok((StatusCode::CREATED, token)),
        Err(StorageError::Conflict(token)) => Ok((StatusCode::CONFLICT, token)),
        Err(err) => Err(err.into()),
    }
}

/// Stored urls may lack a scheme; browsers need one to follow the redirect.
fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_owned()
    } else {
        format!("{DEFAULT_SCHEME}{}", url.trim_start_matches("//"))
    }
}
