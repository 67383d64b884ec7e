//! HTTP surface for the demo server.

use crate::middleware::{UploadedFile, UploadedFiles};
use crate::models::Attachment;
use crate::resizer::Resizer;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::sync::Arc;

/// Field name read by `POST /upload`.
pub const SINGLE_FIELD: &str = "file";
/// Field name read by `POST /upload/batch`.
pub const BATCH_FIELD: &str = "files";

pub fn router(resizer: Arc<Resizer>, max_files: usize, max_body_bytes: usize) -> Router {
    let single = resizer.single(SINGLE_FIELD);
    let batch = resizer.array(BATCH_FIELD, max_files);

    let single_routes = Router::new()
        .route("/upload", post(upload_single))
        .route_layer(middleware::from_fn(move |request: Request, next: Next| {
            single.clone().handle(request, next)
        }));

    let batch_routes = Router::new()
        .route("/upload/batch", post(upload_batch))
        .route_layer(middleware::from_fn(move |request: Request, next: Next| {
            batch.clone().handle(request, next)
        }));

    Router::new()
        .route("/health", get(health))
        .merge(single_routes)
        .merge(batch_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

async fn health() -> &'static str {
    "ok"
}

async fn upload_single(Extension(UploadedFile(file)): Extension<UploadedFile>) -> Json<Attachment> {
    Json(file)
}

async fn upload_batch(
    Extension(UploadedFiles(files)): Extension<UploadedFiles>,
) -> Json<Vec<Attachment>> {
    Json(files)
}
