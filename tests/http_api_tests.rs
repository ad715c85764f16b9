//! Handler-level tests driving the axum router directly.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::{Router, middleware};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use object_store::ObjectStore;
use object_store::memory::InMemory;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxnote_gateway::config::AuthApiSecret;
use voxnote_gateway::core::llm::OpenAiGenerator;
use voxnote_gateway::core::stt::OpenAiTranscriber;
use voxnote_gateway::middleware::auth_middleware;
use voxnote_gateway::storage::{DocumentStore, MemoryDocumentStore};
use voxnote_gateway::{AppState, ServerConfig, routes};

const COPYING_SCRIPT: &str = "#!/bin/sh\n\
    for arg in \"$@\"; do out=\"$arg\"; done\n\
    printf 'fake-mp3-bytes' > \"$out\"\n";

fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-ffmpeg.sh");
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

struct TestApp {
    app: Router,
    _scratch: TempDir,
    _stt_server: MockServer,
    _llm_server: MockServer,
}

async fn test_app(auth_required: bool) -> TestApp {
    let scratch = TempDir::new().unwrap();
    let ffmpeg = write_script(scratch.path(), COPYING_SCRIPT);

    let stt_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hi there"})))
        .mount(&stt_server)
        .await;

    let llm_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Tidy note"}}]
        })))
        .mount(&llm_server)
        .await;

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        openai_api_key: Some("test-key".to_string()),
        stt_base_url: stt_server.uri(),
        stt_model: "whisper-1".to_string(),
        llm_base_url: llm_server.uri(),
        llm_model: "gpt-4o".to_string(),
        ffmpeg_path: ffmpeg,
        ffprobe_path: PathBuf::from("/nonexistent/ffprobe"),
        scratch_dir: scratch.path().to_path_buf(),
        transcode_timeout: Duration::from_secs(10),
        max_clip_seconds: 300.0,
        debug_s3_bucket: None,
        debug_s3_region: None,
        debug_s3_endpoint: None,
        debug_s3_access_key: None,
        debug_s3_secret_key: None,
        debug_public_url_base: None,
        auth_api_secrets: vec![AuthApiSecret {
            id: "client-1".to_string(),
            secret: "s3cret".to_string(),
        }],
        auth_required,
        cors_allowed_origins: None,
        rate_limit_requests_per_second: 60,
        rate_limit_burst_size: 10,
    };

    let documents = Arc::new(MemoryDocumentStore::new());
    let transcriber = OpenAiTranscriber::new(
        "test-key".to_string(),
        stt_server.uri(),
        "whisper-1".to_string(),
    )
    .unwrap();
    let generator = OpenAiGenerator::new("test-key".to_string(), llm_server.uri()).unwrap();

    let state = AppState::with_components(
        config,
        documents as Arc<dyn DocumentStore>,
        Some(Arc::new(InMemory::new()) as Arc<dyn ObjectStore>),
        Arc::new(transcriber),
        Arc::new(generator),
    );

    let protected = routes::api::create_api_router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));
    let public = Router::new().route(
        "/",
        axum::routing::get(voxnote_gateway::handlers::api::health_check),
    );
    let app = public.merge(protected).with_state(state);

    TestApp {
        app,
        _scratch: scratch,
        _stt_server: stt_server,
        _llm_server: llm_server,
    }
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn inline_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/trim-and-transcribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_check_envelope() {
    let test_app = test_app(false).await;
    let response = test_app
        .app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "voxnote-gateway");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_inline_transcription_success() {
    let test_app = test_app(false).await;
    let response = test_app
        .app
        .oneshot(inline_request(json!({
            "fileBlob": BASE64.encode(b"caf-audio"),
            "fromTime": 2,
            "toTime": 5,
            "summarizationType": "simple-cleanup",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["transcription"], "hi there");
    assert_eq!(body["duration"], 3.0);
    assert_eq!(body["fromTime"], 2.0);
    assert_eq!(body["toTime"], 5.0);
    assert_eq!(body["fileSize"], "fake-mp3-bytes".len());
    assert_eq!(body["summary"], "Tidy note");
    assert_eq!(body["post"]["summarizedContent"], "Tidy note");
}

#[tokio::test]
async fn test_inline_transcription_without_summary() {
    let test_app = test_app(false).await;
    let response = test_app
        .app
        .oneshot(inline_request(json!({
            "fileBlob": BASE64.encode(b"caf-audio"),
            "fromTime": 0,
            "toTime": 3,
            "summarizationType": "none",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["transcription"], "hi there");
    assert!(body.get("summary").is_none());
    assert!(body.get("post").is_none());
}

#[tokio::test]
async fn test_invalid_window_yields_400_envelope() {
    let test_app = test_app(false).await;
    let response = test_app
        .app
        .oneshot(inline_request(json!({
            "fileBlob": BASE64.encode(b"caf-audio"),
            "fromTime": 5,
            "toTime": 2,
            "summarizationType": "none",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["status"], 400);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("toTime must be greater than fromTime")
    );
    assert!(body.get("debugFiles").is_none());
}

#[tokio::test]
async fn test_multipart_upload_success() {
    let test_app = test_app(false).await;

    let boundary = "axum-test-boundary";
    let mut body = String::new();
    for (name, value) in [
        ("fromTime", "1"),
        ("toTime", "4"),
        ("summarizationType", "none"),
    ] {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"clip.caf\"\r\n\
         Content-Type: audio/x-caf\r\n\r\ncaf-audio-bytes\r\n--{boundary}--\r\n"
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/trim-and-transcribe/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["transcription"], "hi there");
    assert_eq!(body["duration"], 3.0);
}

#[tokio::test]
async fn test_multipart_upload_requires_file_part() {
    let test_app = test_app(false).await;

    let boundary = "axum-test-boundary";
    let mut body = String::new();
    for (name, value) in [
        ("fromTime", "1"),
        ("toTime", "4"),
        ("summarizationType", "none"),
    ] {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    let request = Request::builder()
        .method("POST")
        .uri("/trim-and-transcribe/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("file part"));
}

#[tokio::test]
async fn test_protected_route_rejects_missing_token() {
    let test_app = test_app(true).await;
    let response = test_app
        .app
        .oneshot(inline_request(json!({
            "fileBlob": BASE64.encode(b"caf-audio"),
            "fromTime": 0,
            "toTime": 3,
            "summarizationType": "none",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_protected_route_accepts_valid_token() {
    let test_app = test_app(true).await;
    let mut request = inline_request(json!({
        "fileBlob": BASE64.encode(b"caf-audio"),
        "fromTime": 0,
        "toTime": 3,
        "summarizationType": "none",
    }));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());

    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_route_is_public_even_with_auth() {
    let test_app = test_app(true).await;
    let response = test_app
        .app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
