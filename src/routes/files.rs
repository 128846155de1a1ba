//! File routes
//!
//! - `POST /upload` - store the multipart field `file` in the bucket
//! - `GET /files` - list object keys (first page only)
//! - `GET /download/{filename}` - fetch an object as an attachment

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, warn};

use crate::models::AppState;
use crate::types::{AppError, AppResult};
use crate::utils::secure_filename;

const FILE_FIELD: &str = "file";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/download/{filename}", get(download_file))
        .with_state(state)
}

/// POST /upload
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<String> {
    info!("File upload request received");

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) = match upload {
        Some((filename, data)) if !filename.is_empty() => (filename, data),
        _ => {
            warn!("Upload rejected: no file selected");
            return Err(AppError::BadRequest("No file selected".to_string()));
        }
    };

    let key = secure_filename(&filename);
    if key.is_empty() {
        warn!(filename = %filename, "Upload rejected: filename has no usable characters");
        return Err(AppError::BadRequest(format!(
            "Invalid filename: {}",
            filename
        )));
    }

    let bucket = state.store.bucket().to_string();
    let size = data.len();
    state.store.put_object(&key, data).await.map_err(|e| {
        error!(key = %key, bucket = %bucket, error = %e, "Upload failed");
        AppError::Upload(e)
    })?;

    info!(key = %key, bucket = %bucket, bytes = size, "File uploaded");
    Ok(format!("Uploaded {} to {}", key, bucket))
}

/// GET /files
async fn list_files(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let keys = state.store.list_keys().await.map_err(|e| {
        error!(bucket = %state.store.bucket(), error = %e, "Listing failed");
        AppError::List(e)
    })?;

    info!(count = keys.len(), "Listed files");
    Ok(Json(keys))
}

/// GET /download/{filename}
async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    info!(key = %filename, "File download request received");

    let data = state.store.get_object(&filename).await.map_err(|e| {
        error!(key = %filename, error = %e, "Download failed");
        AppError::Download(e)
    })?;

    let content_type = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, attachment_disposition(&filename)),
        ],
        data,
    )
        .into_response())
}

/// `Content-Disposition` value forcing a download named `filename`.
///
/// The quoted `filename` parameter only carries printable ASCII; anything
/// else is replaced and the exact name is sent as RFC 5987 `filename*`.
fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if fallback == filename {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::create_router;
    use crate::storage::{MemoryStorage, ObjectStore, StorageError, StorageResult};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-BUCKET-GATE-BOUNDARY";

    /// Counts every call that reaches the backing store.
    struct CountingStore {
        inner: MemoryStorage,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        fn bucket(&self) -> &str {
            self.inner.bucket()
        }

        fn provider(&self) -> &'static str {
            "counting"
        }

        async fn put_object(&self, key: &str, data: Bytes) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.put_object(key, data).await
        }

        async fn list_keys(&self) -> StorageResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_keys().await
        }

        async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_object(key).await
        }
    }

    /// Fails every operation, like an unreachable or misconfigured bucket.
    struct FailingStore;

    #[async_trait]
    impl ObjectStore for FailingStore {
        fn bucket(&self) -> &str {
            "broken-bucket"
        }

        fn provider(&self) -> &'static str {
            "failing"
        }

        async fn put_object(&self, _key: &str, _data: Bytes) -> StorageResult<()> {
            Err(StorageError::Remote("access denied".to_string()))
        }

        async fn list_keys(&self) -> StorageResult<Vec<String>> {
            Err(StorageError::Remote("access denied".to_string()))
        }

        async fn get_object(&self, _key: &str) -> StorageResult<Bytes> {
            Err(StorageError::Remote("access denied".to_string()))
        }
    }

    fn test_config(extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("AWS_BUCKET".to_string(), "test-bucket".to_string());
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    fn counting_app() -> (Router, Arc<CountingStore>) {
        let store = Arc::new(CountingStore {
            inner: MemoryStorage::new("test-bucket"),
            calls: AtomicUsize::new(0),
        });
        let state = AppState::new(test_config(&[]), store.clone());
        (create_router(state), store)
    }

    fn failing_app() -> Router {
        create_router(AppState::new(test_config(&[]), Arc::new(FailingStore)))
    }

    fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn text_only_body() -> Vec<u8> {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY
        )
        .into_bytes()
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_list_download_roundtrip() {
        let (app, _store) = counting_app();

        let response = app
            .clone()
            .oneshot(upload_request(multipart_body("file", "report.pdf", b"ABC")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("report.pdf"), "unexpected body: {text}");
        assert!(text.contains("test-bucket"), "unexpected body: {text}");

        let response = app.clone().oneshot(get_request("/files")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let keys: Vec<String> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(keys, vec!["report.pdf".to_string()]);

        let response = app
            .oneshot(get_request("/download/report.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"ABC"));
    }

    #[tokio::test]
    async fn test_upload_overwrites_same_key() {
        let (app, _store) = counting_app();

        for content in [&b"first"[..], &b"second"[..]] {
            let response = app
                .clone()
                .oneshot(upload_request(multipart_body("file", "notes.txt", content)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(get_request("/download/notes.txt")).await.unwrap();
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_upload_with_empty_file_field_is_rejected() {
        let (app, store) = counting_app();

        let response = app
            .oneshot(upload_request(multipart_body("file", "", b"")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_rejected() {
        let (app, store) = counting_app();

        let response = app.oneshot(upload_request(text_only_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "No file selected");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_with_unusable_filename_is_rejected() {
        let (app, store) = counting_app();

        let response = app
            .oneshot(upload_request(multipart_body("file", "..", b"data")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_traversal_filename_is_stored_as_plain_key() {
        let (app, store) = counting_app();

        let response = app
            .oneshot(upload_request(multipart_body("file", "../../etc/passwd", b"root")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let keys = store.inner.list_keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        let key = &keys[0];
        assert!(!key.is_empty());
        assert!(!key.contains('/'), "key is a path: {key}");
        assert!(!key.starts_with('.'), "key is a path: {key}");
    }

    #[tokio::test]
    async fn test_list_empty_bucket() {
        let (app, _store) = counting_app();

        let response = app.oneshot(get_request("/files")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "[]");
    }

    #[tokio::test]
    async fn test_download_missing_key_is_server_error() {
        let (app, _store) = counting_app();

        let response = app.oneshot(get_request("/download/missing.txt")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await;
        assert!(text.starts_with("Download failed:"), "unexpected body: {text}");
    }

    #[tokio::test]
    async fn test_storage_failures_map_to_500() {
        let app = failing_app();

        let response = app
            .clone()
            .oneshot(upload_request(multipart_body("file", "a.txt", b"x")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            "Upload failed: Storage service error: access denied"
        );

        let response = app.clone().oneshot(get_request("/files")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "Storage service error: access denied" })
        );

        let response = app.oneshot(get_request("/download/a.txt")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            "Download failed: Storage service error: access denied"
        );
    }

    #[tokio::test]
    async fn test_upload_over_body_limit_is_rejected() {
        let store = Arc::new(MemoryStorage::new("test-bucket"));
        let config = test_config(&[("MAX_UPLOAD_BYTES", "16")]);
        let app = create_router(AppState::new(config, store.clone()));

        let response = app
            .oneshot(upload_request(multipart_body("file", "big.bin", &[7u8; 4096])))
            .await
            .unwrap();

        assert!(response.status().is_client_error(), "got {}", response.status());
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            attachment_disposition("résumé.txt"),
            "attachment; filename=\"r_sum_.txt\"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt"
        );
        assert_eq!(
            attachment_disposition("a\"b.txt"),
            "attachment; filename=\"a_b.txt\"; filename*=UTF-8''a%22b.txt"
        );
    }
}
