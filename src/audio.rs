use log::warn;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tokio::sync::Semaphore;

use crate::DynError;

/// Measures audio duration on the blocking thread pool
///
/// At most `max_workers` probes run at once; further callers wait for a permit.
#[derive(Debug, Clone)]
pub struct DurationProbe {
    permits: Arc<Semaphore>,
}

impl DurationProbe {
    pub fn new(max_workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Duration in seconds, or 0.0 if the file cannot be read or decoded
    pub async fn measure(&self, path: &Path, mime_type: Option<&str>) -> f64 {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("Duration probe unavailable: {}", e);
                return 0.0;
            }
        };

        let path: PathBuf = path.to_path_buf();
        let extension = mime_type.and_then(extension_for_mime_type);
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            probe_duration(&path, extension)
        })
        .await;

        match result {
            Ok(Ok(seconds)) => seconds,
            Ok(Err(e)) => {
                warn!("Error getting audio duration: {}", e);
                0.0
            }
            Err(e) => {
                warn!("Duration probe task failed: {}", e);
                0.0
            }
        }
    }
}

/// Guess a container extension from a mime type, used as a probe hint
pub fn extension_for_mime_type(mime_type: &str) -> Option<&'static str> {
    let mime = mime_type.to_ascii_lowercase();
    if mime.contains("mp3") || mime.contains("mpeg") {
        Some("mp3")
    } else if mime.contains("wav") || mime.contains("wave") {
        Some("wav")
    } else if mime.contains("flac") {
        Some("flac")
    } else if mime.contains("ogg") || mime.contains("opus") {
        Some("ogg")
    } else if mime.contains("aac") {
        Some("aac")
    } else if mime.contains("mp4") || mime.contains("m4a") {
        Some("m4a")
    } else {
        None
    }
}

/// Read the duration of an audio file in seconds
///
/// Uses the frame count from the container header when present, otherwise
/// sums packet durations of the first audio track.
pub fn probe_duration(path: &Path, extension_hint: Option<&str>) -> Result<f64, DynError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or("No audio track found")?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
        if rate > 0 {
            return Ok(frames as f64 / rate as f64);
        }
    }

    let time_base = params
        .time_base
        .or_else(|| {
            params
                .sample_rate
                .filter(|rate| *rate > 0)
                .map(|rate| TimeBase::new(1, rate))
        })
        .ok_or("Unknown time base")?;

    let mut total_ts: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total_ts += packet.dur;
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(e.into()),
        }
    }

    let time = time_base.calc_time(total_ts);
    Ok(time.seconds as f64 + time.frac)
}
