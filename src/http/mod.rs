use axum::extract::Extension;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::{self, TraceLayer};

mod caller;
pub(crate) mod uploads;
pub(crate) mod videos;

pub use caller::{Caller, CALLER_HEADER};

use crate::catalog::VideoCatalog;
use crate::cdn::CdnGate;
use crate::errors::Result;
use crate::library::Library;
use crate::objects::ObjectStore;

async fn health() -> Response {
    Json(json!({ "success": true, "message": "API is running..." })).into_response()
}

/// Assembles the service router with the library and CDN gate injected
/// into every route.
pub fn router<C, O>(library: Library<C, O>, cdn: CdnGate) -> Router
where
    C: VideoCatalog,
    O: ObjectStore,
{
    let uploads = uploads::router::<C, O>().layer(Extension(library.clone()));
    let videos = videos::router::<C, O>()
        .layer(Extension(library))
        .layer(Extension(cdn));

    Router::new()
        .route("/", get(health))
        .nest("/upload", uploads)
        .nest("/videos", videos)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().include_headers(true))
                .on_response(trace::DefaultOnResponse::new())
                .on_request(trace::DefaultOnRequest::new()),
        )
}

pub async fn serve<C, O>(library: Library<C, O>, cdn: CdnGate) -> Result<()>
where
    C: VideoCatalog,
    O: ObjectStore,
{
    let app = router(library, cdn);

    axum::Server::bind(&"0.0.0.0:8080".parse()?)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
