//! Upload processing capability
//!
//! Parses an incoming multipart body into stored files before any resizing
//! happens. [`DiskUploadService`] streams file fields to a directory;
//! [`MockUploadService`] hands back canned attachments for tests.

pub mod disk;
pub mod mock;

pub use disk::DiskUploadService;
pub use mock::MockUploadService;

use crate::models::Attachment;
use crate::Result;
use async_trait::async_trait;
use axum::extract::Request;

#[async_trait]
pub trait UploadService: Send + Sync {
    /// Accept at most one file from `field`. `Ok(None)` when the request carried none.
    async fn single(&self, request: Request, field: &str) -> Result<Option<Attachment>>;

    /// Accept up to `max_count` files from `field`, in request order.
    async fn array(&self, request: Request, field: &str, max_count: usize)
        -> Result<Vec<Attachment>>;
}
