use crate::error::{AppError, Result};
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn shorten_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>)> {
    let Json(request) = request.map_err(|_| AppError::BadRequestBody)?;

    let short_url = state.shortener().shorten(&request.long_url).await?;

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            short_url,
            long_url: request.long_url,
        }),
    ))
}

pub async fn redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let long_url = state.redirector().resolve(&short_code).await?;
    let location = HeaderValue::try_from(long_url).map_err(|_| AppError::BadLocation)?;
    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}
