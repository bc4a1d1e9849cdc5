use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use audio_enhancer::client::{AiCousticsClient, Enhancer};
use audio_enhancer::presets::{CustomParams, TranscodeKind};
use audio_enhancer::EnhanceError;

const ENHANCED_BYTES: &[u8] = b"enhanced-audio-bytes";

/// How the mock provider answers
#[derive(Clone)]
struct MockBehavior {
    submit_status: StatusCode,
    submit_body: serde_json::Value,
    download_status: StatusCode,
    delay: Duration,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            submit_status: StatusCode::CREATED,
            submit_body: json!({ "generated_name": "gen123" }),
            download_status: StatusCode::OK,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct Captured {
    api_keys: Vec<String>,
    fields: HashMap<String, String>,
    file_name: Option<String>,
    file_type: Option<String>,
    file_len: usize,
    downloads: Vec<String>,
}

struct MockState {
    behavior: MockBehavior,
    captured: Mutex<Captured>,
    hits: AtomicUsize,
}

async fn submit_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.behavior.delay).await;

    let mut captured = Captured::default();
    if let Some(key) = headers.get("x-api-key") {
        captured.api_keys.push(key.to_str().unwrap().to_string());
    }
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap().to_string();
        if name == "file" {
            captured.file_name = field.file_name().map(str::to_string);
            captured.file_type = field.content_type().map(str::to_string);
            captured.file_len = field.bytes().await.unwrap().len();
        } else {
            captured.fields.insert(name, field.text().await.unwrap());
        }
    }
    *state.captured.lock().unwrap() = captured;

    (
        state.behavior.submit_status,
        Json(state.behavior.submit_body.clone()),
    )
}

async fn download_handler(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.captured.lock().unwrap().downloads.push(name);
    if state.behavior.download_status == StatusCode::OK {
        (StatusCode::OK, Bytes::from_static(ENHANCED_BYTES)).into_response()
    } else {
        (state.behavior.download_status, "missing").into_response()
    }
}

/// Start a mock provider; returns (base url, state)
async fn start_mock_provider(behavior: MockBehavior) -> (String, Arc<MockState>) {
    let state = Arc::new(MockState {
        behavior,
        captured: Mutex::new(Captured::default()),
        hits: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/v1/media/enhance", post(submit_handler))
        .route("/v1/media/{name}", get(download_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), state)
}

fn client(base_url: &str) -> AiCousticsClient {
    AiCousticsClient::new(base_url, Some("test-key".to_string())).unwrap()
}

#[tokio::test]
async fn test_enhance_with_preset() {
    let (url, state) = start_mock_provider(MockBehavior::default()).await;

    let result = client(&url)
        .enhance(Bytes::from_static(b"0123456789"), "audio/mp3", "tiktok", None)
        .await
        .unwrap();

    assert_eq!(result.data.as_ref(), ENHANCED_BYTES);
    assert_eq!(result.generated_name, "gen123");
    assert_eq!(result.transcode_kind, TranscodeKind::Mp3);

    let captured = state.captured.lock().unwrap();
    assert_eq!(captured.api_keys, vec!["test-key".to_string()]);
    assert_eq!(captured.file_name.as_deref(), Some("audio"));
    assert_eq!(captured.file_type.as_deref(), Some("audio/mp3"));
    assert_eq!(captured.file_len, 10);
    assert_eq!(captured.fields["loudness_target_level"], "-14");
    assert_eq!(captured.fields["loudness_peak_limit"], "-1");
    assert_eq!(captured.fields["enhancement_level"], "0.9");
    assert_eq!(captured.fields["transcode_kind"], "MP3");
    assert_eq!(captured.downloads, vec!["gen123".to_string()]);
}

#[tokio::test]
async fn test_custom_params_replace_preset_defaults() {
    let (url, state) = start_mock_provider(MockBehavior::default()).await;

    let custom = CustomParams {
        loudness_target_level: Some(-23),
        loudness_peak_limit: None,
        enhancement_level: Some(0.5),
    };
    let result = client(&url)
        .enhance(Bytes::from_static(b"RIFF"), "audio/wav", "custom", Some(custom))
        .await
        .unwrap();
    assert_eq!(result.transcode_kind, TranscodeKind::Wav);

    let captured = state.captured.lock().unwrap();
    assert_eq!(captured.fields["loudness_target_level"], "-23");
    assert_eq!(captured.fields["enhancement_level"], "0.5");
    assert!(!captured.fields.contains_key("loudness_peak_limit"));
    assert_eq!(captured.fields["transcode_kind"], "WAV");
}

#[tokio::test]
async fn test_missing_api_key_fails_before_network() {
    let (url, state) = start_mock_provider(MockBehavior::default()).await;

    let client = AiCousticsClient::new(&url, None).unwrap();
    let err = client
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();

    assert!(matches!(err, EnhanceError::Configuration(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_quota_and_format_errors_are_translated() {
    for (status, expected) in [
        (
            StatusCode::PAYMENT_REQUIRED,
            "API quota exceeded. Please try again later.",
        ),
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported file format. Only MP3 and WAV are supported.",
        ),
    ] {
        let (url, _state) = start_mock_provider(MockBehavior {
            submit_status: status,
            submit_body: json!({ "error": "nope" }),
            ..Default::default()
        })
        .await;

        let err = client(&url)
            .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), status);
        assert_eq!(err.to_string(), expected);
    }
}

#[tokio::test]
async fn test_other_submit_errors_carry_provider_text() {
    let (url, state) = start_mock_provider(MockBehavior {
        submit_status: StatusCode::BAD_REQUEST,
        submit_body: json!({ "error": "bad level" }),
        ..Default::default()
    })
    .await;

    let err = client(&url)
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("bad level"));
    // No download attempt after a rejected submit
    assert!(state.captured.lock().unwrap().downloads.is_empty());
}

#[tokio::test]
async fn test_unexpected_success_status_is_bad_gateway() {
    // Submit answered with 200 instead of 201
    let (url, state) = start_mock_provider(MockBehavior {
        submit_status: StatusCode::OK,
        submit_body: json!({ "queued": true }),
        ..Default::default()
    })
    .await;

    let err = client(&url)
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EnhanceError::Service { status: 200, .. }));
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    assert!(state.captured.lock().unwrap().downloads.is_empty());

    // Download answered with 202 instead of 200
    let (url, _state) = start_mock_provider(MockBehavior {
        download_status: StatusCode::ACCEPTED,
        ..Default::default()
    })
    .await;

    let err = client(&url)
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    assert!(!err.status_code().is_success());
}

#[tokio::test]
async fn test_missing_generated_name() {
    let (url, _state) = start_mock_provider(MockBehavior {
        submit_body: json!({}),
        ..Default::default()
    })
    .await;

    let err = client(&url)
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.to_string(), "No file name returned from API");
}

#[tokio::test]
async fn test_download_failure_carries_status() {
    let (url, _state) = start_mock_provider(MockBehavior {
        download_status: StatusCode::NOT_FOUND,
        ..Default::default()
    })
    .await;

    let err = client(&url)
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EnhanceError::Service { status: 404, .. }));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let (url, _state) = start_mock_provider(MockBehavior {
        delay: Duration::from_secs(5),
        ..Default::default()
    })
    .await;

    let client = AiCousticsClient::with_timeout(
        &url,
        Some("test-key".to_string()),
        Duration::from_millis(200),
    )
    .unwrap();
    let err = client
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EnhanceError::Timeout));
    assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_unreachable_provider_is_internal_error() {
    // Bind and drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}/v1", addr))
        .enhance(Bytes::from_static(b"x"), "audio/wav", "podcast", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EnhanceError::Internal(_)));
}
