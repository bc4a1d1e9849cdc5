use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::{Bytes, BytesMut};
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc as StdArc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::client::{AiCousticsClient, Enhancer};
use crate::config::Config;
use crate::enhance::{validate_content_type, AudioUpload, EnhanceService};
use crate::error::EnhanceError;
use crate::presets::{Overrides, PresetTable, CUSTOM_PRESET};
use crate::store::LogStore;
use crate::tasks::BackgroundTasks;
use crate::DynError;

/// Headroom on top of the upload limit for the other multipart fields
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

// Shared state for all handlers
pub struct AppState {
    pub service: EnhanceService,
    pub store: LogStore,
    pub static_dir: PathBuf,
    pub enhanced_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &Config, enhancer: StdArc<dyn Enhancer>) -> Self {
        let store = LogStore::new(config.db_path(), config.enhanced_dir());
        Self {
            service: EnhanceService::new(config, enhancer, store.clone()),
            store,
            static_dir: config.static_dir.clone(),
            enhanced_dir: config.enhanced_dir(),
        }
    }
}

#[derive(Serialize)]
struct PresetsResponse {
    presets: PresetTable,
}

/// Build the HTTP application
pub fn build_router(state: StdArc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let body_limit = state
        .service
        .max_upload_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/presets", get(presets_handler))
        .route("/api/enhance", post(enhance_handler))
        .route("/api/download/{filename}", get(download_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/history", get(history_handler))
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("ALLOWALL"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static("frame-ancestors *"),
        ))
        .with_state(state)
}

/// Run the server until Ctrl-C, then stop the background loops
pub async fn serve(config: Config) -> Result<(), DynError> {
    let enhancer = StdArc::new(AiCousticsClient::from_config(&config)?);
    let state = StdArc::new(AppState::new(&config, enhancer));

    state.store.initialize().await?;
    tokio::fs::create_dir_all(&state.enhanced_dir).await?;

    if config.api_key.is_none() {
        warn!("AI_COUSTICS_API_KEY is not set; enhancement requests will fail");
    }

    let tasks = BackgroundTasks::start(&config, state.store.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(|e| format!("Failed to bind to port {}: {}", config.port, e))?;

    println!("Audio enhancer listening on: http://0.0.0.0:{}", config.port);
    println!("Data directory: {}", config.data_dir.display());
    println!("Endpoints:");
    println!("  GET  /  - Upload page");
    println!("  GET  /api/presets  - Available presets");
    println!("  POST /api/enhance  - Enhance an audio file");
    println!("  GET  /api/download/{{filename}}  - Download an enhanced file");
    println!("  GET  /api/stats  - Today's statistics");
    println!("  GET  /api/history  - Requests from the last 7 days");
    println!("  GET  /health  - Health check");

    let shutdown = tasks.cancellation_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    tasks.shutdown().await;
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutdown requested");
        }
        _ = cancel.cancelled() => {}
    }
}

async fn index_handler(State(state): State<StdArc<AppState>>) -> Response {
    match tokio::fs::read_to_string(state.static_dir.join("enhance.html")).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to read enhance.html: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>Frontend not found</h1>"),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn presets_handler() -> impl IntoResponse {
    Json(PresetsResponse {
        presets: PresetTable,
    })
}

async fn enhance_handler(
    State(state): State<StdArc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, EnhanceError> {
    let mut upload: Option<AudioUpload> = None;
    let mut preset = CUSTOM_PRESET.to_string();
    let mut overrides = Overrides::default();
    let max_mb = state.service.max_upload_mb();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, max_mb))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => upload = Some(read_upload(field, &state.service).await?),
            "preset" => {
                let value = field_text(field, max_mb).await?;
                if !value.is_empty() {
                    preset = value;
                }
            }
            "loudness_target" => {
                let value = field_text(field, max_mb).await?;
                overrides.loudness_target = parse_optional(&name, &value)?;
            }
            "loudness_peak" => {
                let value = field_text(field, max_mb).await?;
                overrides.loudness_peak = parse_optional(&name, &value)?;
            }
            "enhancement_level" => {
                let value = field_text(field, max_mb).await?;
                overrides.enhancement_level = parse_optional(&name, &value)?;
            }
            _ => {}
        }
    }

    let upload =
        upload.ok_or_else(|| EnhanceError::InvalidInput("Missing file upload".to_string()))?;
    let result = state.service.handle(upload, &preset, overrides).await?;
    Ok(Json(result).into_response())
}

/// Read the file part, stopping as soon as it exceeds the upload limit
async fn read_upload(
    mut field: Field<'_>,
    service: &EnhanceService,
) -> Result<AudioUpload, EnhanceError> {
    let content_type = field.content_type().map(str::to_string);
    validate_content_type(content_type.as_deref())?;

    let max_bytes = service.max_upload_bytes();
    let max_mb = service.max_upload_mb();
    let mut data = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| map_multipart_error(e, max_mb))?
    {
        if (data.len() + chunk.len()) as u64 > max_bytes {
            return Err(EnhanceError::PayloadTooLarge { max_mb });
        }
        data.extend_from_slice(&chunk);
    }

    let data: Bytes = data.freeze();
    Ok(AudioUpload {
        content_type,
        declared_size: Some(data.len() as u64),
        data,
    })
}

async fn field_text(field: Field<'_>, max_mb: u64) -> Result<String, EnhanceError> {
    field
        .text()
        .await
        .map(|text| text.trim().to_string())
        .map_err(|e| map_multipart_error(e, max_mb))
}

fn parse_optional<T: std::str::FromStr>(name: &str, value: &str) -> Result<Option<T>, EnhanceError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| EnhanceError::InvalidInput(format!("Invalid value for {}: '{}'", name, value)))
}

fn map_multipart_error(err: MultipartError, max_mb: u64) -> EnhanceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        EnhanceError::PayloadTooLarge { max_mb }
    } else {
        EnhanceError::InvalidInput(err.body_text())
    }
}

/// Reject names that could escape the output directory
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
}

/// Content type served for an enhanced file
pub fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".mp3") {
        "audio/mpeg"
    } else {
        "audio/wav"
    }
}

async fn download_handler(
    State(state): State<StdArc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, EnhanceError> {
    if !is_safe_filename(&filename) {
        return Err(EnhanceError::InvalidInput("Invalid filename".to_string()));
    }

    let path = state.enhanced_dir.join(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EnhanceError::NotFound("File not found".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(EnhanceError::NotFound("File not found".to_string()));
    }

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        );
    if let Ok(modified) = metadata.modified() {
        response = response.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
    }

    response
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| EnhanceError::Internal(e.to_string()))
}

async fn stats_handler(State(state): State<StdArc<AppState>>) -> impl IntoResponse {
    Json(state.store.stats_for_today().await)
}

async fn history_handler(State(state): State<StdArc<AppState>>) -> Response {
    match state.store.recent_week().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!("History query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": format!("History error: {}", e) })),
            )
                .into_response()
        }
    }
}
