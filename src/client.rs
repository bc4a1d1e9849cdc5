use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::constants::PROVIDER_TIMEOUT_SECS;
use crate::error::EnhanceError;
use crate::presets::{CustomParams, EnhancementParams, TranscodeKind};

/// Enhanced audio returned by the provider
#[derive(Debug, Clone)]
pub struct EnhancedAudio {
    pub data: Bytes,
    /// Provider-assigned identifier of the generated file
    pub generated_name: String,
    pub transcode_kind: TranscodeKind,
}

/// Something that can enhance an uploaded audio file
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(
        &self,
        data: Bytes,
        mime_type: &str,
        preset: &str,
        custom_params: Option<CustomParams>,
    ) -> Result<EnhancedAudio, EnhanceError>;
}

#[derive(Debug, Deserialize)]
struct EnhanceResponse {
    generated_name: Option<String>,
}

/// HTTP client for the ai-coustics media API
#[derive(Debug, Clone)]
pub struct AiCousticsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AiCousticsClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(PROVIDER_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.api_url, config.api_key.clone())
    }

    /// Submit the file, then download the generated artifact
    async fn exchange(
        &self,
        api_key: &str,
        data: Bytes,
        mime_type: &str,
        params: &EnhancementParams,
    ) -> Result<EnhancedAudio, EnhanceError> {
        let part = Part::stream(data)
            .file_name("audio")
            .mime_str(mime_type)
            .map_err(|e| EnhanceError::InvalidInput(format!("Invalid content type: {}", e)))?;
        let mut form = Form::new().part("file", part);
        for (name, value) in params.form_fields() {
            form = form.text(name, value);
        }

        let response = self
            .http
            .post(format!("{}/media/enhance", self.base_url))
            .header("X-API-Key", api_key)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(submit_error(status, body));
        }

        let body: EnhanceResponse = response.json().await.map_err(map_transport_error)?;
        let generated_name = match body.generated_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(EnhanceError::Service {
                    status: 500,
                    message: "No file name returned from API".to_string(),
                })
            }
        };
        if !is_plain_name(&generated_name) {
            return Err(EnhanceError::Service {
                status: 500,
                message: format!("Invalid file name returned from API: {}", generated_name),
            });
        }
        debug!("Provider accepted upload as {}", generated_name);

        let download = self
            .http
            .get(format!(
                "{}/media/{}",
                self.base_url,
                urlencoding::encode(&generated_name)
            ))
            .header("X-API-Key", api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = download.status();
        if status != StatusCode::OK {
            let body = download.text().await.unwrap_or_default();
            return Err(EnhanceError::Service {
                status: status.as_u16(),
                message: format!("Failed to download enhanced file: {}", body),
            });
        }

        let data = download.bytes().await.map_err(map_transport_error)?;
        info!(
            "Downloaded enhanced file {} ({} bytes)",
            generated_name,
            data.len()
        );

        Ok(EnhancedAudio {
            data,
            generated_name,
            transcode_kind: params.transcode_kind,
        })
    }
}

#[async_trait]
impl Enhancer for AiCousticsClient {
    async fn enhance(
        &self,
        data: Bytes,
        mime_type: &str,
        preset: &str,
        custom_params: Option<CustomParams>,
    ) -> Result<EnhancedAudio, EnhanceError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(EnhanceError::Configuration(
                    "AI Coustics API key not configured".to_string(),
                ))
            }
        };

        let params = EnhancementParams::resolve(preset, custom_params.as_ref(), mime_type);

        match tokio::time::timeout(self.timeout, self.exchange(api_key, data, mime_type, &params))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(EnhanceError::Timeout),
        }
    }
}

/// Translate a non-201 submit response
fn submit_error(status: StatusCode, body: String) -> EnhanceError {
    let message = match status.as_u16() {
        402 => "API quota exceeded. Please try again later.".to_string(),
        415 => "Unsupported file format. Only MP3 and WAV are supported.".to_string(),
        _ => body,
    };
    EnhanceError::Service {
        status: status.as_u16(),
        message,
    }
}

fn map_transport_error(err: reqwest::Error) -> EnhanceError {
    if err.is_timeout() {
        EnhanceError::Timeout
    } else {
        EnhanceError::Internal(err.to_string())
    }
}

/// Provider names end up in local file names; reject anything path-like
fn is_plain_name(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\') && !name.contains("..")
}
