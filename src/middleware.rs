//! axum middleware that uploads, then resizes, before the route handler runs.
//!
//! ```ignore
//! let avatar = resizer.single("avatar");
//! let app = Router::new()
//!     .route("/avatar", post(save_avatar))
//!     .route_layer(axum::middleware::from_fn(move |req, next| {
//!         avatar.clone().handle(req, next)
//!     }));
//! ```
//!
//! On success the handler finds [`UploadedFile`] or [`UploadedFiles`] in the
//! request extensions. Any failure is rendered as the response instead.

use crate::models::Attachment;
use crate::resizer::Resizer;
use crate::{Error, Result};
use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Attachment produced by [`Resizer::single`].
#[derive(Debug, Clone)]
pub struct UploadedFile(pub Attachment);

/// Attachments produced by [`Resizer::array`], in upload order.
#[derive(Debug, Clone)]
pub struct UploadedFiles(pub Vec<Attachment>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadMode {
    Single { field: String },
    Array { field: String, max_count: usize },
}

#[derive(Clone)]
pub struct UploadMiddleware {
    resizer: Arc<Resizer>,
    mode: UploadMode,
}

impl UploadMiddleware {
    pub(crate) fn new(resizer: Arc<Resizer>, mode: UploadMode) -> Self {
        Self { resizer, mode }
    }

    /// Upload and process, returning the request to hand to the next layer.
    ///
    /// The body is consumed by the upload step, so the returned request
    /// carries an empty body plus the attachment extension.
    pub async fn run(&self, request: Request) -> Result<Request> {
        let upload = self
            .resizer
            .upload_service()
            .ok_or_else(|| Error::Config("upload service is not configured".to_string()))?;

        let (mut parts, body) = request.into_parts();
        let mut upload_request = Request::new(body);
        *upload_request.headers_mut() = parts.headers.clone();
        *upload_request.extensions_mut() = parts.extensions.clone();

        match &self.mode {
            UploadMode::Single { field } => {
                let mut file = upload
                    .single(upload_request, field)
                    .await?
                    .ok_or_else(|| Error::UploadNotFound("Uploaded file not found.".to_string()))?;

                let path = file.path.clone();
                self.resizer.process_image(&path, &mut file).await?;
                parts.extensions.insert(UploadedFile(file));
            }
            UploadMode::Array { field, max_count } => {
                let mut files = upload.array(upload_request, field, *max_count).await?;
                if files.is_empty() {
                    return Err(Error::UploadNotFound(
                        "Uploaded files not found.".to_string(),
                    ));
                }

                self.resizer.process_files(&mut files).await?;
                parts.extensions.insert(UploadedFiles(files));
            }
        }

        Ok(Request::from_parts(parts, Body::empty()))
    }

    /// Entry point for `axum::middleware::from_fn`.
    pub async fn handle(self, request: Request, next: Next) -> Response {
        match self.run(request).await {
            Ok(request) => next.run(request).await,
            Err(e) => e.into_response(),
        }
    }
}
