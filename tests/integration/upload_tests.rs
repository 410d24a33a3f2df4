//! Upload pipeline integration tests.
//!
//! Tests verify:
//! - Missing, disallowed and oversized uploads map to the JSON error contract
//! - Rejected uploads leave the storage directory untouched
//! - Generated and requested naming through the HTTP surface
//! - Stored files round-trip through the retrieval route

use std::collections::HashSet;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use super::test_utils::{
    body_bytes, body_json, dir_entries, test_router, test_router_with_limit, upload_request,
    MultipartBody, PNG_BYTES, UPLOADS,
};

fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").unwrap().1;
    &rest[rest.find('/').unwrap()..]
}

// =============================================================================
// Missing File
// =============================================================================

#[tokio::test]
async fn test_missing_file_fields() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new()
        .text("title", "holiday")
        .file("avatar", "a.png", "image/png", PNG_BYTES);

    let response = test_router(dir.path())
        .oneshot(upload_request(UPLOADS, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "No file uploaded" })
    );
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_non_multipart_body_is_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri(UPLOADS)
        .header("content-type", "application/json")
        .body(Body::from(r#"{"file":"nope"}"#))
        .unwrap();

    let response = test_router(dir.path()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No file uploaded");
}

// =============================================================================
// Disallowed Type
// =============================================================================

#[tokio::test]
async fn test_disallowed_type_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new().file("file", "notes.txt", "text/plain", b"hello");

    let response = test_router(dir.path())
        .oneshot(upload_request(UPLOADS, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Only image files are allowed" })
    );
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_requested_name_with_disallowed_type() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("existing.png"), b"keep").unwrap();

    let body = MultipartBody::new().file("file", "my@#$file.txt", "text/plain", b"text");
    let response = test_router(dir.path())
        .oneshot(upload_request(&format!("{}/my%40%23%24file", UPLOADS), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Only image files are allowed"
    );
    assert_eq!(dir_entries(dir.path()), vec!["existing.png".to_string()]);
}

// =============================================================================
// Oversized
// =============================================================================

#[tokio::test]
async fn test_oversized_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new().file("file", "big.png", "image/png", &[7u8; 100]);

    let response = test_router_with_limit(dir.path(), 16)
        .oneshot(upload_request(UPLOADS, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "File too large", "code": "LIMIT_FILE_SIZE" })
    );
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_body_beyond_request_limit_is_oversized() {
    let dir = tempfile::tempdir().unwrap();
    // Larger than the limit plus the multipart allowance
    let payload = vec![0u8; 200 * 1024];
    let body = MultipartBody::new().file("file", "huge.png", "image/png", &payload);

    let response = test_router_with_limit(dir.path(), 16)
        .oneshot(upload_request(UPLOADS, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["code"], "LIMIT_FILE_SIZE");
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn test_exact_limit_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new().file("file", "edge.png", "image/png", &[1u8; 16]);

    let response = test_router_with_limit(dir.path(), 16)
        .oneshot(upload_request(UPLOADS, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

// =============================================================================
// Successful Uploads
// =============================================================================

#[tokio::test]
async fn test_generated_upload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());
    let body = MultipartBody::new().file("file", "photo.png", "image/png", PNG_BYTES);

    let response = router
        .clone()
        .oneshot(upload_request(UPLOADS, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let filename = json["filename"].as_str().unwrap().to_string();
    let url = json["url"].as_str().unwrap().to_string();

    assert!(filename.ends_with(".png"));
    assert_eq!(
        url,
        format!("http://files.example.com{}/{}", UPLOADS, filename)
    );
    assert_eq!(dir_entries(dir.path()), vec![filename.clone()]);

    let response = router
        .oneshot(
            Request::builder()
                .uri(path_of(&url))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert_eq!(body_bytes(response).await, PNG_BYTES);
}

#[tokio::test]
async fn test_trailing_slash_upload() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new().file("file", "photo.gif", "image/gif", b"GIF89a");

    let response = test_router(dir.path())
        .oneshot(upload_request(&format!("{}/", UPLOADS), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(body_json(response).await["filename"]
        .as_str()
        .unwrap()
        .ends_with(".gif"));
}

#[tokio::test]
async fn test_requested_name_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());
    let uri = format!("{}/report", UPLOADS);

    let first = MultipartBody::new().file("file", "scan.png", "image/png", b"first");
    let response = router.clone().oneshot(upload_request(&uri, first)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["filename"], "report.png");
    assert_eq!(
        json["url"],
        format!("http://files.example.com{}/report.png", UPLOADS)
    );

    let second = MultipartBody::new().file("file", "scan.png", "image/png", b"second");
    let response = router.oneshot(upload_request(&uri, second)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["filename"], "report.png");

    assert_eq!(dir_entries(dir.path()), vec!["report.png".to_string()]);
    assert_eq!(
        std::fs::read(dir.path().join("report.png")).unwrap(),
        b"second"
    );
}

#[tokio::test]
async fn test_requested_name_is_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new().file("image", "pic.jpg", "image/jpeg", b"jpeg");

    let response = test_router(dir.path())
        .oneshot(upload_request(&format!("{}/my%40%23%24file", UPLOADS), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["filename"], "my---file.jpg");
    assert!(dir.path().join("my---file.jpg").is_file());
}

#[tokio::test]
async fn test_traversal_hint_stays_in_directory() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new().file("file", "x.png", "image/png", b"x");

    let response = test_router(dir.path())
        .oneshot(upload_request(
            &format!("{}/..%2F..%2Fetc%2Fpasswd", UPLOADS),
            body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let filename = body_json(response).await["filename"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!filename.contains('/'));
    assert!(!filename.starts_with('.'));
    assert_eq!(dir_entries(dir.path()), vec![filename]);
}

#[tokio::test]
async fn test_image_alias_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new()
        .text("caption", "sunset")
        .file("image", "sunset.webp", "image/webp", b"RIFF");

    let response = test_router(dir.path())
        .oneshot(upload_request(UPLOADS, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(body_json(response).await["filename"]
        .as_str()
        .unwrap()
        .ends_with(".webp"));
}

#[tokio::test]
async fn test_file_field_preferred_over_image() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new()
        .file("image", "alias.gif", "image/gif", b"alias")
        .file("file", "primary.png", "image/png", b"primary");

    let response = test_router(dir.path())
        .oneshot(upload_request(&format!("{}/chosen", UPLOADS), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["filename"], "chosen.png");
    assert_eq!(dir_entries(dir.path()), vec!["chosen.png".to_string()]);
    assert_eq!(
        std::fs::read(dir.path().join("chosen.png")).unwrap(),
        b"primary"
    );
}

#[tokio::test]
async fn test_url_honours_forwarded_proto() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBody::new().file("file", "a.png", "image/png", b"a");
    let mut request = upload_request(&format!("{}/a", UPLOADS), body);
    request
        .headers_mut()
        .insert("x-forwarded-proto", "https".parse().unwrap());

    let response = test_router(dir.path()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await["url"],
        format!("https://files.example.com{}/a.png", UPLOADS)
    );
}

#[tokio::test]
async fn test_concurrent_generated_uploads_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let requests = (0..25).map(|i| {
        let router = router.clone();
        async move {
            let body = MultipartBody::new().file("file", "same.png", "image/png", &[i as u8; 8]);
            let response = router.oneshot(upload_request(UPLOADS, body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            body_json(response).await["filename"]
                .as_str()
                .unwrap()
                .to_string()
        }
    });

    let names: HashSet<String> = futures::future::join_all(requests)
        .await
        .into_iter()
        .collect();

    assert_eq!(names.len(), 25);
    assert_eq!(dir_entries(dir.path()).len(), 25);
}

// =============================================================================
// Retrieval
// =============================================================================

#[tokio::test]
async fn test_get_unknown_file_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_router(dir.path())
        .oneshot(
            Request::builder()
                .uri(format!("{}/nothing-here.png", UPLOADS))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Not Found");
}

#[tokio::test]
async fn test_get_invalid_name_is_404() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".hidden"), b"secret").unwrap();

    for name in [".hidden", "..%2Fsecret", "a%20b.png"] {
        let response = test_router(dir.path())
            .oneshot(
                Request::builder()
                    .uri(format!("{}/{}", UPLOADS, name))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", name);
    }
}

// =============================================================================
// Storage Failures
// =============================================================================

#[tokio::test]
async fn test_storage_root_replaced_by_file_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("uploads");
    let router = test_router(&root);

    std::fs::remove_dir(&root).unwrap();
    std::fs::write(&root, b"not a directory").unwrap();

    let body = MultipartBody::new().file("file", "photo.png", "image/png", PNG_BYTES);
    let response = router.oneshot(upload_request(UPLOADS, body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({ "error": "Internal Server Error" }));
    assert!(!json.to_string().contains(&*dir.path().to_string_lossy()));

    assert_eq!(dir_entries(dir.path()), vec!["uploads".to_string()]);
    assert_eq!(std::fs::read(&root).unwrap(), b"not a directory");
}

#[tokio::test]
async fn test_failed_commit_leaves_no_staging_file() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    // A directory squatting on the target name makes the final rename fail
    std::fs::create_dir(dir.path().join("report.png")).unwrap();
    std::fs::write(dir.path().join("report.png").join("keep"), b"x").unwrap();

    let body = MultipartBody::new().file("file", "scan.png", "image/png", PNG_BYTES);
    let response = router
        .oneshot(upload_request(&format!("{}/report", UPLOADS), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({ "error": "Internal Server Error" }));
    assert!(!json.to_string().contains(&*dir.path().to_string_lossy()));

    assert_eq!(dir_entries(dir.path()), vec!["report.png".to_string()]);
    assert!(dir.path().join("report.png").is_dir());
}
