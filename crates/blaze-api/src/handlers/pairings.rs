//! Video/thumbnail pairing handlers.
//!
//! A chat first registers the video it wants re-sent, then uploads a cover
//! image. The image is transcoded into a JPEG that fits the thumbnail budget
//! and returned together with the waiting video.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::info;

use blaze_models::{ChatId, EncodeAttempt, PairingEntry, VideoDescriptor};
use blaze_session::SessionError;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Register a video as waiting for its thumbnail.
pub async fn start_pairing(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    Json(video): Json<VideoDescriptor>,
) -> ApiResult<(StatusCode, Json<PairingEntry>)> {
    if video.file_id.trim().is_empty() {
        return Err(ApiError::bad_request("file_id must not be empty"));
    }

    let entry = state.pairings.start(chat_id, video)?;
    metrics::set_pending_pairings(state.pairings.len());

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Get the video waiting in a chat.
pub async fn get_pairing(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> ApiResult<Json<PairingEntry>> {
    state
        .pairings
        .get(chat_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No video waiting in chat {}", chat_id)))
}

/// Drop the video waiting in a chat.
pub async fn cancel_pairing(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> ApiResult<StatusCode> {
    state.pairings.cancel(chat_id)?;
    metrics::set_pending_pairings(state.pairings.len());

    Ok(StatusCode::NO_CONTENT)
}

/// Delivered thumbnail.
#[derive(Serialize)]
pub struct ThumbnailInfo {
    pub mime_type: &'static str,
    pub size_bytes: u64,
    /// The upload was already a small enough JPEG
    pub passthrough: bool,
    pub attempts: Vec<EncodeAttempt>,
    /// Base64-encoded JPEG
    pub data: String,
}

/// Thumbnail submission response.
#[derive(Serialize)]
pub struct ThumbnailResponse {
    pub chat_id: ChatId,
    /// The waiting video, unchanged
    pub video: VideoDescriptor,
    pub thumbnail: ThumbnailInfo,
}

/// Attach an uploaded cover image to the waiting video.
///
/// The pairing is consumed before transcoding starts, so a failed transcode
/// requires the video to be sent again.
pub async fn submit_thumbnail(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    body: Bytes,
) -> ApiResult<Json<ThumbnailResponse>> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Thumbnail body is empty"));
    }

    let video = state.pairings.claim(chat_id).map_err(|e| match e {
        SessionError::NotFound(_) => {
            ApiError::not_found(format!("No video waiting in chat {}; send the video first", chat_id))
        }
        other => ApiError::from(other),
    })?;
    metrics::set_pending_pairings(state.pairings.len());

    let result = state
        .engine
        .transcode_bytes(body.to_vec(), &state.config.budget)
        .await?;
    let thumbnail = result.into_thumbnail()?;

    info!(
        chat_id = %chat_id,
        file_id = %video.file_id,
        size_bytes = thumbnail.size_bytes(),
        passthrough = thumbnail.passthrough,
        attempts = thumbnail.attempts.len(),
        "Thumbnail ready"
    );
    metrics::record_thumbnail_size(thumbnail.size_bytes(), thumbnail.passthrough);

    Ok(Json(ThumbnailResponse {
        chat_id,
        video,
        thumbnail: ThumbnailInfo {
            mime_type: "image/jpeg",
            size_bytes: thumbnail.size_bytes(),
            passthrough: thumbnail.passthrough,
            data: STANDARD.encode(&thumbnail.data),
            attempts: thumbnail.attempts,
        },
    }))
}
