//! Video upload and read handlers.

use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::{info, warn};

use tubely_models::{MediaType, Video, VideoId, IMAGE_JPEG, IMAGE_PNG, VIDEO_MP4};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::ingest::multipart_error;
use crate::state::AppState;

/// Multipart field carrying the video bytes.
pub const VIDEO_FIELD: &str = "video";
/// Multipart field carrying the thumbnail bytes.
pub const THUMBNAIL_FIELD: &str = "thumbnail";

const THUMBNAIL_TYPES: [&str; 2] = [IMAGE_JPEG, IMAGE_PNG];

fn parse_video_id(raw: &str) -> ApiResult<VideoId> {
    raw.parse()
        .map_err(|_| ApiError::invalid_input("Invalid video ID"))
}

/// Parse, authenticate, load, and authorize, in that order. Nothing about the
/// body has been read when this returns.
async fn authorize(state: &AppState, raw_id: &str, headers: &HeaderMap) -> ApiResult<(AuthUser, Video)> {
    let video_id = parse_video_id(raw_id)?;
    let user = state.auth.authenticate(headers)?;
    let video = state.ingest.load_owned(&video_id, &user).await?;
    Ok((user, video))
}

async fn open_multipart(state: &AppState, request: Request) -> ApiResult<Multipart> {
    Multipart::from_request(request, state).await.map_err(|e| {
        warn!("Rejected multipart request: {}", e.body_text());
        ApiError::invalid_input("Request must be multipart/form-data")
    })
}

/// Declared media type of a file part. Missing or unparsable is invalid input.
fn declared_media_type(field: &Field<'_>) -> ApiResult<MediaType> {
    let declared = field
        .content_type()
        .ok_or_else(|| ApiError::invalid_input("Missing Content-Type for file"))?;
    MediaType::parse(declared).map_err(|_| ApiError::invalid_input("Invalid Content-Type"))
}

fn missing_field(name: &str) -> ApiError {
    ApiError::invalid_input(format!("Missing form field '{}'", name))
}

/// `POST /videos/:video_id/upload`
///
/// Publishes a single MP4 and returns the record with a signed playback URL.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    request: Request,
) -> ApiResult<Json<Video>> {
    let result = upload_video_inner(&state, &raw_id, request).await;
    metrics::record_ingest("video", &result);
    result.map(Json)
}

async fn upload_video_inner(state: &AppState, raw_id: &str, request: Request) -> ApiResult<Video> {
    let (user, video) = authorize(state, raw_id, request.headers()).await?;

    let mut multipart = open_multipart(state, request).await?;
    let field = loop {
        match multipart.next_field().await.map_err(|e| multipart_error(&e))? {
            Some(field) if field.name() == Some(VIDEO_FIELD) => break field,
            Some(_) => continue,
            None => return Err(missing_field(VIDEO_FIELD)),
        }
    };

    let media_type = declared_media_type(&field)?;
    if !media_type.is(VIDEO_MP4) {
        warn!(video_id = %video.id, media_type = %media_type, "Rejected unsupported video type");
        return Err(ApiError::UnsupportedMediaType(
            "Invalid file type, only MP4 is allowed".to_string(),
        ));
    }

    info!(video_id = %video.id, user_id = %user.user_id, "Uploading video");

    let staged = state.ingest.stage(&media_type, field).await?;
    state.ingest.publish_video(video, &staged, &media_type).await
}

/// `POST /videos/:video_id/thumbnail_upload`
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    request: Request,
) -> ApiResult<Json<Video>> {
    let result = upload_thumbnail_inner(&state, &raw_id, request).await;
    metrics::record_ingest("thumbnail", &result);
    result.map(Json)
}

async fn upload_thumbnail_inner(state: &AppState, raw_id: &str, request: Request) -> ApiResult<Video> {
    let (user, video) = authorize(state, raw_id, request.headers()).await?;

    let mut multipart = open_multipart(state, request).await?;
    let field = loop {
        match multipart.next_field().await.map_err(|e| multipart_error(&e))? {
            Some(field) if field.name() == Some(THUMBNAIL_FIELD) => break field,
            Some(_) => continue,
            None => return Err(missing_field(THUMBNAIL_FIELD)),
        }
    };

    let media_type = declared_media_type(&field)?;
    if !media_type.is_any_of(&THUMBNAIL_TYPES) {
        warn!(video_id = %video.id, media_type = %media_type, "Rejected unsupported thumbnail type");
        return Err(ApiError::UnsupportedMediaType(
            "Invalid file type, only JPEG and PNG are allowed".to_string(),
        ));
    }

    info!(video_id = %video.id, user_id = %user.user_id, "Uploading thumbnail");

    let staged = state.ingest.stage(&media_type, field).await?;
    state.ingest.publish_thumbnail(video, &staged, &media_type).await
}

/// `GET /videos/:video_id`
pub async fn get_video(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Video>> {
    let (_, video) = authorize(&state, &raw_id, &headers).await?;
    Ok(Json(state.ingest.sign_video(video).await?))
}
