use std::collections::BTreeMap;

use rama::http::{
    BodyExtractExt as _, StatusCode,
    header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, DATE, SERVER},
    service::client::HttpClientExt as _,
};

use super::runtime;
use crate::config::ServerSettings;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_index_and_health() {
    let runtime = runtime::spawn().await;
    let client = runtime.client();

    let resp = client.get(runtime.url("/")).send().await.unwrap();
    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!("ok", resp.try_into_string().await.unwrap());

    let resp = client.get(runtime.url("/health")).send().await.unwrap();
    assert_eq!(StatusCode::OK, resp.status());
    let payload: serde_json::Value =
        serde_json::from_str(&resp.try_into_string().await.unwrap()).unwrap();
    assert_eq!(serde_json::json!({"status": "ok"}), payload);

    runtime.shutdown().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_required_response_headers() {
    let runtime = runtime::spawn().await;

    let resp = runtime.client().get(runtime.url("/")).send().await.unwrap();
    assert_eq!(
        crate::utils::env::server_identifier(),
        resp.headers().get(SERVER).unwrap().to_str().unwrap()
    );
    assert!(resp.headers().contains_key(DATE));

    runtime.shutdown().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_data() {
    let runtime = runtime::spawn_with_settings(ServerSettings {
        max_data_size: Some("4KB".to_owned()),
        ..Default::default()
    })
    .await;
    let client = runtime.client();

    let resp = client.get(runtime.url("/data?s=1KB")).send().await.unwrap();
    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!(
        "application/octet-stream",
        resp.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap()
    );
    assert_eq!(
        "1024",
        resp.headers().get(CONTENT_LENGTH).unwrap().to_str().unwrap()
    );
    let payload = resp.try_into_string().await.unwrap();
    assert_eq!(1024, payload.len());
    assert!(payload.bytes().all(|b| b == 0));

    for path in ["/data?s=0", "/data?s=0B"] {
        let resp = client.get(runtime.url(path)).send().await.unwrap();
        assert_eq!(StatusCode::OK, resp.status(), "path: {path}");
        assert!(resp.try_into_string().await.unwrap().is_empty(), "path: {path}");
    }

    for (path, expected_msg) in [
        ("/data?s=5KB", "size exceeds maximum"),
        ("/data?s=5XB", "invalid data unit"),
    ] {
        let resp = client.get(runtime.url(path)).send().await.unwrap();
        assert_eq!(StatusCode::BAD_REQUEST, resp.status(), "path: {path}");
        assert_eq!(expected_msg, resp.try_into_string().await.unwrap());
    }

    let resp = client
        .post(runtime.url("/data?s=1KB"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::METHOD_NOT_ALLOWED, resp.status());
    assert_eq!("GET, HEAD", resp.headers().get(ALLOW).unwrap().to_str().unwrap());

    runtime.shutdown().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_error() {
    let runtime = runtime::spawn().await;
    let client = runtime.client();

    for (path, expected_status) in [
        ("/error/401", StatusCode::UNAUTHORIZED),
        ("/error/503", StatusCode::SERVICE_UNAVAILABLE),
        ("/error/399", StatusCode::BAD_REQUEST),
        ("/error/999", StatusCode::BAD_REQUEST),
        ("/error/abc", StatusCode::NOT_FOUND),
        ("/nope", StatusCode::NOT_FOUND),
    ] {
        let resp = client.get(runtime.url(path)).send().await.unwrap();
        assert_eq!(expected_status, resp.status(), "path: {path}");
    }

    let resp = client.get(runtime.url("/error/401")).send().await.unwrap();
    assert_eq!("Unauthorized", resp.try_into_string().await.unwrap());

    runtime.shutdown().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_headers_echo() {
    let runtime = runtime::spawn().await;

    let resp = runtime
        .client()
        .get(runtime.url("/headers"))
        .header("X-Test", "a")
        .header("X-Test", "b")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, resp.status());

    let payload: BTreeMap<String, Vec<String>> =
        serde_json::from_str(&resp.try_into_string().await.unwrap()).unwrap();
    assert_eq!(vec!["a", "b"], payload["X-Test"]);
    assert!(payload.keys().all(|name| !name.starts_with(|c: char| c.is_ascii_lowercase())));

    runtime.shutdown().await;
}
