use super::UploadService;
use crate::models::Attachment;
use crate::Result;
use async_trait::async_trait;
use axum::extract::Request;
use std::sync::{Arc, Mutex};

/// Returns preconfigured attachments and ignores the request body.
#[derive(Clone)]
pub struct MockUploadService {
    files: Vec<Attachment>,
    should_fail: bool,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockUploadService {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            should_fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_files(mut self, files: Vec<Attachment>) -> Self {
        self.files = files;
        self
    }

    pub fn with_failure(mut self, should_fail: bool) -> Self {
        self.should_fail = should_fail;
        self
    }

    /// `(field, max_count)` for every call; `single` records a limit of 1.
    pub fn get_calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, field: &str, max_count: usize) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((field.to_string(), max_count));
        if self.should_fail {
            return Err(crate::Error::Upload("Mock upload failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MockUploadService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadService for MockUploadService {
    async fn single(&self, _request: Request, field: &str) -> Result<Option<Attachment>> {
        self.record(field, 1)?;
        Ok(self.files.first().cloned())
    }

    async fn array(
        &self,
        _request: Request,
        field: &str,
        max_count: usize,
    ) -> Result<Vec<Attachment>> {
        self.record(field, max_count)?;
        Ok(self.files.iter().take(max_count).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> Request {
        Request::new(Body::empty())
    }

    #[tokio::test]
    async fn test_mock_upload_returns_files() {
        let service = MockUploadService::new().with_files(vec![
            Attachment::new("/up/a.png"),
            Attachment::new("/up/b.png"),
        ]);

        let single = service.single(request(), "file").await.unwrap();
        let array = service.array(request(), "files", 1).await.unwrap();

        assert_eq!(single, Some(Attachment::new("/up/a.png")));
        assert_eq!(array.len(), 1);
        assert_eq!(
            service.get_calls(),
            vec![("file".to_string(), 1), ("files".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_mock_upload_failure() {
        let service = MockUploadService::new().with_failure(true);
        let result = service.single(request(), "file").await;
        assert!(result.is_err());
    }
}
