//! Upload-to-download orchestration for a single enhancement request

use bytes::Bytes;
use chrono::{Local, NaiveDateTime};
use log::{error, info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::audio::DurationProbe;
use crate::client::Enhancer;
use crate::config::Config;
use crate::constants::{
    BYTES_PER_MB, ENHANCED_FILE_PREFIX, FINGERPRINT_LEN, OUTPUT_TIMESTAMP_FORMAT,
    TEMP_FILE_PREFIX,
};
use crate::error::EnhanceError;
use crate::presets::Overrides;
use crate::store::{round_to, LogStore, RequestLogEntry};

/// An uploaded file as received from the multipart form
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub content_type: Option<String>,
    /// Size announced by the client, if any
    pub declared_size: Option<u64>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhanceResult {
    pub success: bool,
    pub filename: String,
    pub download_url: String,
    pub processing_time: f64,
    pub audio_duration: f64,
    pub preset_used: String,
}

/// Unrounded measurements of a successful request, as written to the log
struct Processed {
    filename: String,
    audio_duration: f64,
    processing_time: f64,
    size_mb: f64,
}

/// Runs uploads through validation, the provider and the request log
#[derive(Clone)]
pub struct EnhanceService {
    enhancer: Arc<dyn Enhancer>,
    store: LogStore,
    probe: DurationProbe,
    enhanced_dir: PathBuf,
    max_upload_mb: u64,
}

impl EnhanceService {
    pub fn new(config: &Config, enhancer: Arc<dyn Enhancer>, store: LogStore) -> Self {
        Self {
            enhancer,
            store,
            probe: DurationProbe::new(config.max_concurrent_enhancements),
            enhanced_dir: config.enhanced_dir(),
            max_upload_mb: config.max_upload_mb,
        }
    }

    pub fn max_upload_mb(&self) -> u64 {
        self.max_upload_mb
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn enhanced_dir(&self) -> &Path {
        &self.enhanced_dir
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Enhance one upload and record the outcome
    ///
    /// Validation failures are returned before anything touches the disk and
    /// are not recorded. Everything after that is logged as success or failure.
    pub async fn handle(
        &self,
        upload: AudioUpload,
        preset: &str,
        overrides: Overrides,
    ) -> Result<EnhanceResult, EnhanceError> {
        let started = Instant::now();

        let mime_type = validate_content_type(upload.content_type.as_deref())?.to_string();
        let max_bytes = self.max_upload_bytes();
        let too_large = upload.declared_size.is_some_and(|size| size > max_bytes)
            || upload.data.len() as u64 > max_bytes;
        if too_large {
            return Err(EnhanceError::PayloadTooLarge {
                max_mb: self.max_upload_mb,
            });
        }

        let temp_path = self
            .enhanced_dir
            .join(format!("{}{}", TEMP_FILE_PREFIX, fingerprint(&upload.data)));

        let outcome = self
            .process(&upload.data, &temp_path, &mime_type, preset, overrides, started)
            .await;

        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
            }
        }

        let now = Local::now().naive_local();
        let entry = match &outcome {
            Ok(done) => RequestLogEntry::success(
                now,
                preset,
                done.audio_duration,
                done.processing_time,
                done.size_mb,
                &done.filename,
            ),
            Err(e) => {
                error!("Enhancement failed for preset '{}': {}", preset, e);
                RequestLogEntry::failure(now, preset, &e.to_string())
            }
        };
        if let Err(e) = self.store.append(&entry).await {
            error!("Failed to record enhancement request: {}", e);
        }

        outcome.map(|done| EnhanceResult {
            success: true,
            download_url: format!("/api/download/{}", done.filename),
            filename: done.filename,
            processing_time: round_to(done.processing_time, 2),
            audio_duration: round_to(done.audio_duration, 2),
            preset_used: preset.to_string(),
        })
    }

    async fn process(
        &self,
        data: &Bytes,
        temp_path: &Path,
        mime_type: &str,
        preset: &str,
        overrides: Overrides,
        started: Instant,
    ) -> Result<Processed, EnhanceError> {
        tokio::fs::create_dir_all(&self.enhanced_dir).await?;
        tokio::fs::write(temp_path, data).await?;

        let duration = self.probe.measure(temp_path, Some(mime_type)).await;

        let custom_params = overrides.into_custom_params(preset);
        let enhanced = self
            .enhancer
            .enhance(data.clone(), mime_type, preset, custom_params)
            .await?;

        let filename = output_filename(
            Local::now().naive_local(),
            &enhanced.generated_name,
            enhanced.transcode_kind.extension(),
        );
        tokio::fs::write(self.enhanced_dir.join(&filename), &enhanced.data).await?;

        let processing_time = started.elapsed().as_secs_f64();
        let size_mb = data.len() as f64 / BYTES_PER_MB as f64;
        info!(
            "Enhanced {:.2}s of audio with preset '{}' in {:.2}s -> {}",
            duration, preset, processing_time, filename
        );

        Ok(Processed {
            filename,
            audio_duration: duration,
            processing_time,
            size_mb,
        })
    }
}

/// Accept only `audio/*` uploads; returns the mime type
pub fn validate_content_type(content_type: Option<&str>) -> Result<&str, EnhanceError> {
    match content_type {
        Some(mime) if mime.starts_with("audio/") => Ok(mime),
        _ => Err(EnhanceError::InvalidInput(
            "Only audio files are allowed".to_string(),
        )),
    }
}

/// First hex characters of the SHA-256 of the upload
pub fn fingerprint(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// `enhanced_<YYYYMMDDHHMMSS>_<generated_name>.<ext>`
pub fn output_filename(at: NaiveDateTime, generated_name: &str, extension: &str) -> String {
    format!(
        "{}{}_{}.{}",
        ENHANCED_FILE_PREFIX,
        at.format(OUTPUT_TIMESTAMP_FORMAT),
        generated_name,
        extension
    )
}
