use std::collections::HashMap;

use ::http::StatusCode;
use axum::extract::{DefaultBodyLimit, Extension, Multipart, Query};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::catalog::VideoCatalog;
use crate::errors::{Error, Result};
use crate::library::{Library, MAX_VIDEO_BYTES};
use crate::objects::ObjectStore;

use super::caller::Caller;

// sits above the application's own ceiling so an oversize upload gets the
// validation message instead of a transport-level 413
const BODY_LIMIT: usize = MAX_VIDEO_BYTES + 8 * 1024 * 1024;

pub fn router<C: VideoCatalog, O: ObjectStore>() -> Router {
    Router::new()
        .route("/video", post(upload_video::<C, O>))
        .route("/initialize", get(initialize::<C, O>))
        .route("/chunk", put(upload_chunk::<C, O>))
        .route("/complete", post(complete::<C, O>))
        .route("/abort", delete(abort::<C, O>))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

async fn upload_video<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Caller(caller): Caller,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut title = String::new();
    let mut file: Option<(Bytes, Option<String>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().map(String::from);
                file = Some((field.bytes().await?, content_type));
            }
            Some("title") => title = field.text().await?,
            _ => {}
        }
    }

    let (body, content_type) =
        file.ok_or_else(|| Error::Validation(String::from("File not found")))?;
    let content_type = content_type.unwrap_or_else(|| String::from("video/mp4"));

    let video = library
        .uploads()
        .upload_video(&caller, &title, body, &content_type)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "newVideo": video })),
    )
        .into_response())
}

async fn initialize<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Caller(caller): Caller,
    Query(query_params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let content_type = query_params
        .get("fileType")
        .map(String::as_str)
        .unwrap_or("video/mp4");

    let session = library.uploads().initialize(&caller, content_type).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "uploadId": session.upload_id,
            "videoId": session.video_id,
            "videoPath": session.storage_key,
        })),
    )
        .into_response())
}

async fn upload_chunk<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Caller(caller): Caller,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut body: Option<Bytes> = None;
    let mut index: Option<String> = None;
    let mut upload_id: Option<String> = None;
    let mut video_path: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("file") => body = Some(field.bytes().await?),
            Some("index") => index = Some(field.text().await?),
            Some("uploadId") => upload_id = Some(field.text().await?),
            Some("videoPath") => video_path = Some(field.text().await?),
            _ => {}
        }
    }

    let body = body.ok_or_else(|| Error::Validation(String::from("Chunk not found")))?;
    let (index, upload_id, video_path) = match (index, upload_id, video_path) {
        (Some(index), Some(upload_id), Some(video_path)) => (index, upload_id, video_path),
        _ => return Err(Error::Validation(String::from("All fields are required"))),
    };
    let client_index: i32 = index
        .parse()
        .map_err(|_| Error::Validation(String::from("All fields are required")))?;

    let e_tag = library
        .uploads()
        .upload_chunk(&caller, &video_path, &upload_id, client_index, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "ETag": e_tag })),
    )
        .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRequest {
    upload_id: Option<String>,
    title: Option<String>,
    video_id: Option<String>,
    video_path: Option<String>,
}

async fn complete<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Caller(caller): Caller,
    Json(request): Json<CompleteRequest>,
) -> Result<Response> {
    let (upload_id, video_id, video_path) =
        match (request.upload_id, request.video_id, request.video_path) {
            (Some(upload_id), Some(video_id), Some(video_path)) => {
                (upload_id, video_id, video_path)
            }
            _ => return Err(Error::Validation(String::from("All fields are required"))),
        };
    let video_id = Uuid::parse_str(&video_id)
        .map_err(|_| Error::Validation(String::from("Invalid video id")))?;
    let title = request.title.unwrap_or_default();

    let video = library
        .uploads()
        .complete(&caller, &video_id, &video_path, &upload_id, &title)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "newVideo": video })),
    )
        .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbortRequest {
    upload_id: Option<String>,
    video_path: Option<String>,
}

async fn abort<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Caller(caller): Caller,
    Json(request): Json<AbortRequest>,
) -> Result<Response> {
    let (upload_id, video_path) = match (request.upload_id, request.video_path) {
        (Some(upload_id), Some(video_path)) => (upload_id, video_path),
        _ => return Err(Error::Validation(String::from("Upload Id is required"))),
    };

    library
        .uploads()
        .abort(&caller, &video_path, &upload_id)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}
