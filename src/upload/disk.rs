use super::UploadService;
use crate::models::Attachment;
use crate::naming;
use crate::{Error, Result};
use async_trait::async_trait;
use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Stores file fields under `upload_dir/<uuid>.<original extension>`.
///
/// Text fields and file inputs left empty (no filename) are ignored. A file
/// field under any other name, or more files than allowed, rejects the whole
/// request and removes what was already written for it.
pub struct DiskUploadService {
    upload_dir: PathBuf,
}

impl DiskUploadService {
    pub fn new(upload_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(upload_dir)?;
        Ok(Self {
            upload_dir: upload_dir.to_path_buf(),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    async fn collect(
        &self,
        request: Request,
        field: &str,
        max_count: usize,
    ) -> Result<Vec<Attachment>> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);
        if !is_multipart {
            tracing::debug!("Request is not multipart/form-data, nothing to upload");
            return Ok(Vec::new());
        }

        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| Error::Upload(format!("Invalid multipart request: {}", e)))?;

        let mut files = Vec::new();
        match self.read_fields(multipart, field, max_count, &mut files).await {
            Ok(()) => Ok(files),
            Err(e) => {
                for file in &files {
                    if let Err(remove_err) = tokio::fs::remove_file(&file.path).await {
                        tracing::warn!(
                            "Failed to remove {} after rejected upload: {}",
                            file.path.display(),
                            remove_err
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn read_fields(
        &self,
        mut multipart: Multipart,
        field: &str,
        max_count: usize,
        files: &mut Vec<Attachment>,
    ) -> Result<()> {
        while let Some(part) = multipart
            .next_field()
            .await
            .map_err(|e| Error::Upload(format!("Failed to read multipart: {}", e)))?
        {
            if part.file_name().map_or(true, str::is_empty) {
                continue;
            }

            let name = part.name().unwrap_or_default().to_string();
            if name != field {
                return Err(Error::Upload(format!("Unexpected field `{}`", name)));
            }
            if files.len() >= max_count {
                return Err(Error::Upload(format!(
                    "Too many files for field `{}` (limit {})",
                    field, max_count
                )));
            }

            files.push(self.store(part).await?);
        }
        Ok(())
    }

    async fn store(&self, mut part: Field<'_>) -> Result<Attachment> {
        let field_name = part.name().unwrap_or_default().to_string();
        let original_name = part.file_name().unwrap_or_default().to_string();
        let mime_type = part
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let path = self.upload_dir.join(stored_file_name(&original_name));
        let size = match write_field(&mut part, &path).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
        };

        tracing::info!(
            "Stored upload {} ({} bytes) at {}",
            original_name,
            size,
            path.display()
        );

        Ok(Attachment {
            field_name,
            original_name,
            mime_type,
            path,
            size,
            ..Attachment::default()
        })
    }
}

/// Random name that keeps the client's extension when it is plain alphanumeric.
fn stored_file_name(original_name: &str) -> String {
    let id = Uuid::new_v4();
    let ext = if original_name.contains('.') {
        naming::extension(original_name)
    } else {
        ""
    };

    if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        format!("{}.{}", id, ext.to_ascii_lowercase())
    } else {
        id.to_string()
    }
}

async fn write_field(part: &mut Field<'_>, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut size = 0u64;

    while let Some(chunk) = part
        .chunk()
        .await
        .map_err(|e| Error::Upload(format!("Failed to read file data: {}", e)))?
    {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(size)
}

#[async_trait]
impl UploadService for DiskUploadService {
    async fn single(&self, request: Request, field: &str) -> Result<Option<Attachment>> {
        Ok(self.collect(request, field, 1).await?.into_iter().next())
    }

    async fn array(
        &self,
        request: Request,
        field: &str,
        max_count: usize,
    ) -> Result<Vec<Attachment>> {
        self.collect(request, field, max_count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tempfile::TempDir;

    const BOUNDARY: &str = "resizer-test-boundary";

    fn file_part(field: &str, filename: &str, data: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: image/png\r\n\r\n{d}\r\n",
            b = BOUNDARY,
            f = field,
            n = filename,
            d = data
        )
    }

    fn text_part(field: &str, value: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"\r\n\r\n{v}\r\n",
            b = BOUNDARY,
            f = field,
            v = value
        )
    }

    fn multipart_request(parts: &[String]) -> Request {
        axum::http::Request::builder()
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(format!("{}--{}--\r\n", parts.concat(), BOUNDARY)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_single_stores_file() {
        let dir = TempDir::new().unwrap();
        let service = DiskUploadService::new(dir.path()).unwrap();

        let attachment = service
            .single(
                multipart_request(&[
                    text_part("title", "hello"),
                    file_part("avatar", "me.PNG", "pixels"),
                ]),
                "avatar",
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(attachment.field_name, "avatar");
        assert_eq!(attachment.original_name, "me.PNG");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.size, 6);
        assert!(attachment.path.starts_with(dir.path()));
        assert!(attachment.path.to_string_lossy().ends_with(".png"));
        assert_eq!(std::fs::read(&attachment.path).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_single_without_file_is_none() {
        let dir = TempDir::new().unwrap();
        let service = DiskUploadService::new(dir.path()).unwrap();

        let result = service
            .single(multipart_request(&[text_part("title", "x")]), "avatar")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_empty_file_input_is_skipped() {
        let dir = TempDir::new().unwrap();
        let service = DiskUploadService::new(dir.path()).unwrap();

        let result = service
            .single(multipart_request(&[file_part("avatar", "", "")]), "avatar")
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_non_multipart_request_has_no_files() {
        let dir = TempDir::new().unwrap();
        let service = DiskUploadService::new(dir.path()).unwrap();

        let files = service
            .array(Request::new(Body::from("plain")), "photos", 3)
            .await
            .unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_array_preserves_order() {
        let dir = TempDir::new().unwrap();
        let service = DiskUploadService::new(dir.path()).unwrap();

        let files = service
            .array(
                multipart_request(&[
                    file_part("photos", "one.jpg", "1"),
                    file_part("photos", "two.jpg", "22"),
                ]),
                "photos",
                5,
            )
            .await
            .unwrap();

        let names: Vec<_> = files.iter().map(|f| f.original_name.as_str()).collect();
        assert_eq!(names, vec!["one.jpg", "two.jpg"]);
        assert_eq!(files[1].size, 2);
    }

    #[tokio::test]
    async fn test_array_over_limit_is_rejected_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let service = DiskUploadService::new(dir.path()).unwrap();

        let result = service
            .array(
                multipart_request(&[
                    file_part("photos", "one.jpg", "1"),
                    file_part("photos", "two.jpg", "2"),
                ]),
                "photos",
                1,
            )
            .await;

        assert!(matches!(result, Err(Error::Upload(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unexpected_file_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        let service = DiskUploadService::new(dir.path()).unwrap();

        let err = service
            .single(multipart_request(&[file_part("other", "x.png", "x")]), "avatar")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unexpected field `other`"));
    }

    #[test]
    fn test_stored_file_name_extension() {
        assert!(stored_file_name("photo.JPG").ends_with(".jpg"));
        assert!(!stored_file_name("photo").contains('.'));
        assert!(!stored_file_name("evil.png/../x").contains('/'));
    }
}
