use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::error::format_api_error;

#[derive(Debug, Clone, PartialEq)]
struct ReceivedPart {
    field: String,
    filename: Option<String>,
    content_type: Option<String>,
    size: usize,
}

#[derive(Clone, Default)]
struct ServerState {
    received: Arc<Mutex<Vec<ReceivedPart>>>,
}

async fn collect_parts(state: &ServerState, mut multipart: Multipart) -> Vec<ReceivedPart> {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
        parts.push(ReceivedPart {
            field: field_name,
            filename,
            content_type,
            size,
        });
    }
    state.received.lock().await.extend(parts.clone());
    parts
}

async fn handle_single_image(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Json<PredictionResult> {
    let parts = collect_parts(&state, multipart).await;
    Json(PredictionResult {
        filename: parts
            .first()
            .and_then(|p| p.filename.clone())
            .unwrap_or_default(),
        media_type: MediaType::Image,
        predicted_label: "violin".into(),
        confidence: 0.93,
    })
}

async fn handle_batch_audio(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Json<BatchPredictionResponse> {
    let parts = collect_parts(&state, multipart).await;
    let results: Vec<_> = parts
        .iter()
        .map(|p| PredictionResult {
            filename: p.filename.clone().unwrap_or_default(),
            media_type: MediaType::Audio,
            predicted_label: "flute".into(),
            confidence: 0.7,
        })
        .collect();
    Json(BatchPredictionResponse {
        total_processed: results.len(),
        success_count: results.len(),
        error_count: 0,
        results,
    })
}

async fn handle_validation_error() -> impl IntoResponse {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({
            "detail": [
                {"loc": ["body", "file"], "msg": "too large", "type": "x"},
                {"loc": ["body", "file"], "msg": "bad type", "type": "y"}
            ]
        })),
    )
}

async fn handle_too_large() -> StatusCode {
    StatusCode::PAYLOAD_TOO_LARGE
}

async fn handle_slow() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

async fn handle_garbage() -> &'static str {
    "not json"
}

async fn spawn_prediction_server() -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/predict/image/", post(handle_single_image))
        .route("/predict/audio/", post(handle_validation_error))
        .route("/predict/batch/audio", post(handle_batch_audio))
        .route("/predict/batch/image", post(handle_too_large))
        .route("/slow/predict/image/", post(handle_slow))
        .route("/garbage/predict/audio/", post(handle_garbage))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn gateway_for(api_url: &str, timeout_secs: u64) -> HttpPredictionGateway {
    let settings = Settings {
        api_url: api_url.to_string(),
        timeout_secs,
        ..Settings::default()
    };
    HttpPredictionGateway::new(&settings).expect("gateway")
}

#[tokio::test]
async fn single_image_is_sent_under_file_field() {
    let (server_url, state) = spawn_prediction_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url, 5);

    let file = UploadFile::from_bytes("cat.jpg", vec![1u8; 2048]);
    let result = gateway.predict_image(&file).await.expect("predict");

    assert_eq!(
        result,
        PredictionResult {
            filename: "cat.jpg".into(),
            media_type: MediaType::Image,
            predicted_label: "violin".into(),
            confidence: 0.93,
        }
    );
    let received = state.received.lock().await.clone();
    assert_eq!(
        received,
        vec![ReceivedPart {
            field: "file".into(),
            filename: Some("cat.jpg".into()),
            content_type: Some("image/jpeg".into()),
            size: 2048,
        }]
    );
}

#[tokio::test]
async fn batch_audio_repeats_files_field_in_order() {
    let (server_url, state) = spawn_prediction_server().await.expect("spawn server");
    let gateway = gateway_for(&format!("{server_url}/"), 5);

    let files = vec![
        UploadFile::from_bytes("one.wav", vec![0u8; 3]),
        UploadFile::from_bytes("two.mp3", vec![0u8; 5]),
        UploadFile::from_bytes("three.ogg", vec![0u8; 7]),
    ];
    let response = gateway.batch_predict_audio(&files).await.expect("batch");

    assert_eq!(response.total_processed, 3);
    assert!(response.is_consistent_with(files.len()));
    let names: Vec<_> = response.results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["one.wav", "two.mp3", "three.ogg"]);

    let received = state.received.lock().await.clone();
    assert!(received.iter().all(|part| part.field == "files"));
    assert_eq!(
        received.iter().map(|p| p.size).collect::<Vec<_>>(),
        vec![3, 5, 7]
    );
}

#[tokio::test]
async fn validation_body_is_preserved_on_error_status() {
    let (server_url, _state) = spawn_prediction_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url, 5);

    let err = gateway
        .predict_audio(&UploadFile::from_bytes("a.wav", vec![0u8; 1]))
        .await
        .expect_err("422 must fail");

    assert_eq!(err.status(), Some(422));
    assert!(!err.is_transient());
    assert_eq!(format_api_error(&err, "fallback"), "too large, bad type");
}

#[tokio::test]
async fn status_without_body_maps_to_fixed_message() {
    let (server_url, _state) = spawn_prediction_server().await.expect("spawn server");
    let gateway = gateway_for(&server_url, 5);

    let err = gateway
        .batch_predict_image(&[UploadFile::from_bytes("a.png", vec![0u8; 1])])
        .await
        .expect_err("413 must fail");

    assert!(matches!(err, GatewayError::Status { status: 413, body: None }));
    assert_eq!(
        format_api_error(&err, "fallback"),
        crate::error::PAYLOAD_TOO_LARGE_MESSAGE
    );
}

#[tokio::test]
async fn slow_backend_surfaces_timeout() {
    let (server_url, _state) = spawn_prediction_server().await.expect("spawn server");
    let gateway = gateway_for(&format!("{server_url}/slow"), 1);

    let err = gateway
        .predict_image(&UploadFile::from_bytes("a.png", vec![0u8; 1]))
        .await
        .expect_err("must time out");

    assert!(matches!(err, GatewayError::Timeout), "unexpected error: {err:?}");
}

#[tokio::test]
async fn unreachable_backend_surfaces_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");

    let gateway = gateway_for(&format!("http://{addr}"), 5);
    let err = gateway
        .predict_image(&UploadFile::from_bytes("a.png", vec![0u8; 1]))
        .await
        .expect_err("must fail to connect");

    assert!(matches!(err, GatewayError::Connect(_)), "unexpected error: {err:?}");
    assert_eq!(
        format_api_error(&err, "fallback"),
        crate::error::CONNECT_MESSAGE
    );
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let (server_url, _state) = spawn_prediction_server().await.expect("spawn server");
    let gateway = gateway_for(&format!("{server_url}/garbage"), 5);

    let err = gateway
        .predict_audio(&UploadFile::from_bytes("a.wav", vec![0u8; 1]))
        .await
        .expect_err("must fail to decode");

    assert!(matches!(err, GatewayError::Decode(_)));
    assert_eq!(format_api_error(&err, "Error processing audio"), "Error processing audio");
}

#[test]
fn rejects_invalid_base_url() {
    let settings = Settings {
        api_url: "localhost without scheme".into(),
        ..Settings::default()
    };
    assert!(HttpPredictionGateway::new(&settings).is_err());
}

#[test]
fn client_build_failure_is_a_config_error() {
    let builder_error = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("relative url must not build");
    let err: ConfigError = builder_error.into();

    assert!(matches!(err, ConfigError::HttpClient(_)));
    assert!(err.to_string().starts_with("failed to build http client"));
}

#[test]
fn trailing_slash_is_trimmed_from_server_url() {
    let gateway = gateway_for("http://localhost:8000/", 60);
    assert_eq!(gateway.server_url(), "http://localhost:8000");
}
