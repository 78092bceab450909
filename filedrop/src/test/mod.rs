//! End-to-end tests across the server, the storage clients and the upload client.


use crate::client::{ReqwestTransport, SelectedFile, UPLOAD_SUCCEEDED, UploadClient};
use crate::config::CorsOrigin;
use crate::storage::InMemoryStore;
use crate::test_utils::{TEST_BUCKET, create_test_config, create_test_server, install_crypto_provider, spawn_test_server};
use axum::http::StatusCode;
use serde_json::Value;

/// 2 MB `report.pdf` through the Rust client: progress runs to 100, the status reads success and
/// the returned link resolves to the same bytes and content type.
#[test_log::test(tokio::test)]
async fn test_e2e_client_uploads_report_through_server() {
    install_crypto_provider();
    let store = InMemoryStore::new(TEST_BUCKET);
    let server_url = spawn_test_server(create_test_config(), store.clone()).await;

    let payload: Vec<u8> = (0..2 * 1024 * 1024).map(|i| (i % 253) as u8).collect();
    let mut client = UploadClient::new(ReqwestTransport::new(&server_url).unwrap());
    client.select(vec![SelectedFile::new("report.pdf", "application/pdf", payload.clone())]);

    let mut progress = client.subscribe();
    let observed = tokio::spawn(async move {
        let mut seen = Vec::new();
        while progress.changed().await.is_ok() {
            seen.push(*progress.borrow_and_update());
        }
        seen
    });

    let location = client.upload().await.unwrap();

    assert_eq!(client.status_message(), UPLOAD_SUCCEEDED);
    assert!(client.is_success());
    assert_eq!(client.progress(), 100);
    assert_eq!(location, "https://uploads.s3.amazonaws.com/report.pdf");

    let stored = store.resolve(&location).unwrap();
    assert_eq!(stored.body.as_ref(), payload.as_slice());
    assert_eq!(stored.content_type, "application/pdf");

    drop(client);
    let seen = observed.await.unwrap();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {seen:?}");
}

#[tokio::test]
async fn test_e2e_client_without_selection_never_reaches_server() {
    install_crypto_provider();
    let store = InMemoryStore::new(TEST_BUCKET);
    let server_url = spawn_test_server(create_test_config(), store.clone()).await;
    let mut client = UploadClient::new(ReqwestTransport::new(&server_url).unwrap());

    assert!(client.upload().await.is_err());

    assert_eq!(client.status_message(), crate::client::NO_FILES_SELECTED);
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_healthz() {
    let server = create_test_server(create_test_config(), InMemoryStore::new(TEST_BUCKET));

    let response = server.get("/healthz").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_root_serves_browser_client() {
    let server = create_test_server(create_test_config(), InMemoryStore::new(TEST_BUCKET));

    let response = server.get("/").await;

    response.assert_status_ok();
    assert!(response.text().contains("upload-button"));
}

#[tokio::test]
async fn test_openapi_document_describes_upload() {
    let server = create_test_server(create_test_config(), InMemoryStore::new(TEST_BUCKET));

    let response = server.get("/api/openapi.json").await;

    response.assert_status_ok();
    let doc: Value = response.json();
    assert!(doc["paths"]["/api/upload"]["post"].is_object());
    assert!(doc["components"]["schemas"]["UploadResponse"].is_object());

    server.get("/api/docs").await.assert_status_ok();
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let mut config = create_test_config();
    config.security.cors.allowed_origins = vec![CorsOrigin::Url("https://files.example.com".parse().unwrap())];
    let server = create_test_server(config, InMemoryStore::new(TEST_BUCKET));

    let response = server
        .method(axum::http::Method::OPTIONS, "/api/upload")
        .add_header("origin", "https://files.example.com")
        .add_header("access-control-request-method", "POST")
        .await;

    assert_eq!(
        response.headers().get("access-control-allow-origin").map(|v| v.to_str().unwrap()),
        Some("https://files.example.com")
    );
}

#[tokio::test]
async fn test_no_cors_headers_by_default() {
    let server = create_test_server(create_test_config(), InMemoryStore::new(TEST_BUCKET));

    let response = server
        .post("/api/upload")
        .add_header("origin", "https://elsewhere.example.com")
        .multipart(axum_test::multipart::MultipartForm::new().add_text("x", "y"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get("access-control-allow-origin").is_none());
}
