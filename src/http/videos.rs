use std::collections::HashMap;

use ::http::header::{self, HeaderMap, HeaderValue};
use ::http::StatusCode;
use axum::extract::{Extension, Path};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::catalog::{Video, VideoCatalog};
use crate::cdn::{CdnGate, SignedCookie};
use crate::errors::{Error, Result};
use crate::library::Library;
use crate::objects::ObjectStore;

use super::caller::Caller;

pub fn router<C: VideoCatalog, O: ObjectStore>() -> Router {
    Router::new()
        .route("/", get(list::<C, O>))
        .route(
            "/:id",
            get(get_by_id::<C, O>)
                .patch(rename::<C, O>)
                .delete(remove::<C, O>),
        )
        .route("/user/:id", get(list_by_owner::<C, O>))
}

async fn list<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Extension(cdn): Extension<CdnGate>,
) -> Result<Response> {
    let videos = library.videos().list_processed().await?;
    let headers = cookie_headers(cdn.cookies_for(&cdn.thumbnails_resource())?)?;

    Ok((
        StatusCode::OK,
        headers,
        Json(json!({ "success": true, "videos": videos })),
    )
        .into_response())
}

#[derive(Serialize)]
struct VideoWithUrl {
    #[serde(flatten)]
    video: Video,
    url: Option<String>,
}

async fn get_by_id<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Extension(cdn): Extension<CdnGate>,
    Path(path_params): Path<HashMap<String, String>>,
) -> Result<Response> {
    let id = parse_video_id(&path_params)?;
    let video = library.videos().get(&id).await?;

    let url = cdn.hls_url(&video);
    let headers = match &url {
        Some(url) => cookie_headers(cdn.cookies_for(&cdn.hls_resource(url))?)?,
        None => HeaderMap::new(),
    };

    Ok((
        StatusCode::OK,
        headers,
        Json(json!({ "success": true, "video": VideoWithUrl { video, url } })),
    )
        .into_response())
}

async fn list_by_owner<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Extension(cdn): Extension<CdnGate>,
    Caller(caller): Caller,
    Path(path_params): Path<HashMap<String, String>>,
) -> Result<Response> {
    let owner_id = path_params
        .get("id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Validation(String::from("User id is required")))?;

    let videos = library.videos().list_by_owner(&caller, owner_id).await?;
    let headers = cookie_headers(cdn.cookies_for(&cdn.thumbnails_resource())?)?;

    Ok((
        StatusCode::OK,
        headers,
        Json(json!({ "success": true, "videos": videos })),
    )
        .into_response())
}

#[derive(Deserialize)]
struct RenameRequest {
    title: Option<String>,
}

async fn rename<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Caller(caller): Caller,
    Path(path_params): Path<HashMap<String, String>>,
    Json(request): Json<RenameRequest>,
) -> Result<Response> {
    let id = parse_video_id(&path_params)?;
    let title = request.title.unwrap_or_default();
    library.videos().rename(&id, &caller, &title).await?;

    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

async fn remove<C: VideoCatalog, O: ObjectStore>(
    Extension(library): Extension<Library<C, O>>,
    Caller(caller): Caller,
    Path(path_params): Path<HashMap<String, String>>,
) -> Result<Response> {
    let id = parse_video_id(&path_params)?;
    library.videos().delete(&id, &caller).await?;

    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

fn parse_video_id(path_params: &HashMap<String, String>) -> Result<Uuid> {
    path_params
        .get("id")
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| Error::Validation(String::from("Video id is required")))
}

fn cookie_headers(cookies: Vec<SignedCookie>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_str(&cookie.header_value())?,
        );
    }
    Ok(headers)
}
