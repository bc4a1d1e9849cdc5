use serde::ser::{Serialize, SerializeMap, Serializer};

/// Named bundle of enhancement parameters
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Preset {
    /// Human-readable label
    pub name: &'static str,
    /// Integrated loudness target in LUFS
    pub loudness_target: i32,
    /// True peak limit in dBTP
    pub loudness_peak: i32,
    /// Enhancement strength, 0.0 to 1.0
    pub enhancement_level: f64,
    pub description: &'static str,
}

pub const CUSTOM_PRESET: &str = "custom";

/// Fixed preset table, in display order
pub static PRESETS: [(&str, Preset); 5] = [
    (
        "instagram_story",
        Preset {
            name: "Instagram Story",
            loudness_target: -14,
            loudness_peak: -1,
            enhancement_level: 0.8,
            description: "Tuned for Instagram Stories",
        },
    ),
    (
        "youtube",
        Preset {
            name: "YouTube",
            loudness_target: -14,
            loudness_peak: -1,
            enhancement_level: 1.0,
            description: "YouTube standard loudness",
        },
    ),
    (
        "podcast",
        Preset {
            name: "Podcast",
            loudness_target: -16,
            loudness_peak: -1,
            enhancement_level: 1.0,
            description: "Tuned for podcasts and speech",
        },
    ),
    (
        "tiktok",
        Preset {
            name: "TikTok",
            loudness_target: -14,
            loudness_peak: -1,
            enhancement_level: 0.9,
            description: "Tuned for TikTok videos",
        },
    ),
    (
        CUSTOM_PRESET,
        Preset {
            name: "Custom",
            loudness_target: -14,
            loudness_peak: -1,
            enhancement_level: 1.0,
            description: "Your own settings",
        },
    ),
];

pub const LOUDNESS_TARGET_RANGE: (i32, i32) = (-70, -5);
pub const LOUDNESS_PEAK_RANGE: (i32, i32) = (-9, 0);
pub const ENHANCEMENT_LEVEL_RANGE: (f64, f64) = (0.0, 1.0);

pub fn find_preset(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|(k, _)| *k == key).map(|(_, p)| p)
}

/// Look up a preset, falling back to the custom defaults for unknown keys
pub fn preset_or_custom(key: &str) -> &'static Preset {
    find_preset(key).unwrap_or(&PRESETS[PRESETS.len() - 1].1)
}

/// Serializes the preset table as a JSON object keyed by preset id, keeping table order
pub struct PresetTable;

impl Serialize for PresetTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PRESETS.len()))?;
        for (key, preset) in PRESETS.iter() {
            map.serialize_entry(key, preset)?;
        }
        map.end()
    }
}

pub fn clamp_loudness_target(value: i32) -> i32 {
    value.clamp(LOUDNESS_TARGET_RANGE.0, LOUDNESS_TARGET_RANGE.1)
}

pub fn clamp_loudness_peak(value: i32) -> i32 {
    value.clamp(LOUDNESS_PEAK_RANGE.0, LOUDNESS_PEAK_RANGE.1)
}

pub fn clamp_enhancement_level(value: f64) -> f64 {
    value.clamp(ENHANCEMENT_LEVEL_RANGE.0, ENHANCEMENT_LEVEL_RANGE.1)
}

/// Per-request overrides as submitted with the upload form
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub loudness_target: Option<i32>,
    pub loudness_peak: Option<i32>,
    pub enhancement_level: Option<f64>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.loudness_target.is_none()
            && self.loudness_peak.is_none()
            && self.enhancement_level.is_none()
    }

    /// Turn overrides into provider parameters
    ///
    /// Only honoured for the custom preset and only when at least one value is
    /// present. Each present value is clamped to its allowed range.
    pub fn into_custom_params(self, preset: &str) -> Option<CustomParams> {
        if preset != CUSTOM_PRESET || self.is_empty() {
            return None;
        }
        Some(CustomParams {
            loudness_target_level: self.loudness_target.map(clamp_loudness_target),
            loudness_peak_limit: self.loudness_peak.map(clamp_loudness_peak),
            enhancement_level: self.enhancement_level.map(clamp_enhancement_level),
        })
    }
}

/// Provider parameters supplied explicitly instead of taken from a preset.
/// Absent fields are not sent at all.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CustomParams {
    pub loudness_target_level: Option<i32>,
    pub loudness_peak_limit: Option<i32>,
    pub enhancement_level: Option<f64>,
}

/// Output format requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeKind {
    Mp3,
    Wav,
}

impl TranscodeKind {
    /// MP3 when the upload's mime type mentions mp3, WAV otherwise
    pub fn for_mime_type(mime_type: &str) -> Self {
        if mime_type.to_ascii_lowercase().contains("mp3") {
            TranscodeKind::Mp3
        } else {
            TranscodeKind::Wav
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeKind::Mp3 => "MP3",
            TranscodeKind::Wav => "WAV",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TranscodeKind::Mp3 => "mp3",
            TranscodeKind::Wav => "wav",
        }
    }
}

/// Effective parameters for one provider call
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementParams {
    pub loudness_target_level: Option<i32>,
    pub loudness_peak_limit: Option<i32>,
    pub enhancement_level: Option<f64>,
    pub transcode_kind: TranscodeKind,
}

impl EnhancementParams {
    pub fn resolve(preset: &str, custom: Option<&CustomParams>, mime_type: &str) -> Self {
        let transcode_kind = TranscodeKind::for_mime_type(mime_type);
        match custom {
            Some(custom) => Self {
                loudness_target_level: custom.loudness_target_level,
                loudness_peak_limit: custom.loudness_peak_limit,
                enhancement_level: custom.enhancement_level,
                transcode_kind,
            },
            None => {
                let preset = preset_or_custom(preset);
                Self {
                    loudness_target_level: Some(preset.loudness_target),
                    loudness_peak_limit: Some(preset.loudness_peak),
                    enhancement_level: Some(preset.enhancement_level),
                    transcode_kind,
                }
            }
        }
    }

    /// Multipart text fields sent alongside the file
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(4);
        if let Some(target) = self.loudness_target_level {
            fields.push(("loudness_target_level", target.to_string()));
        }
        if let Some(peak) = self.loudness_peak_limit {
            fields.push(("loudness_peak_limit", peak.to_string()));
        }
        if let Some(level) = self.enhancement_level {
            fields.push(("enhancement_level", level.to_string()));
        }
        fields.push(("transcode_kind", self.transcode_kind.as_str().to_string()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        assert_eq!(clamp_loudness_target(-100), -70);
        assert_eq!(clamp_loudness_target(10), -5);
        assert_eq!(clamp_loudness_target(-23), -23);
        assert_eq!(clamp_loudness_peak(-20), -9);
        assert_eq!(clamp_loudness_peak(3), 0);
        assert_eq!(clamp_enhancement_level(1.5), 1.0);
        assert_eq!(clamp_enhancement_level(-0.2), 0.0);
    }

    #[test]
    fn test_overrides_only_apply_to_custom() {
        let overrides = Overrides {
            loudness_target: Some(-100),
            ..Default::default()
        };
        assert_eq!(overrides.into_custom_params("podcast"), None);

        let params = overrides.into_custom_params(CUSTOM_PRESET).unwrap();
        assert_eq!(params.loudness_target_level, Some(-70));
        assert_eq!(params.loudness_peak_limit, None);
        assert_eq!(params.enhancement_level, None);

        assert_eq!(Overrides::default().into_custom_params(CUSTOM_PRESET), None);
    }

    #[test]
    fn test_resolve_from_preset() {
        let params = EnhancementParams::resolve("podcast", None, "audio/wav");
        assert_eq!(params.loudness_target_level, Some(-16));
        assert_eq!(params.loudness_peak_limit, Some(-1));
        assert_eq!(params.enhancement_level, Some(1.0));
        assert_eq!(params.transcode_kind, TranscodeKind::Wav);
    }

    #[test]
    fn test_unknown_preset_uses_custom_defaults() {
        let params = EnhancementParams::resolve("radio", None, "audio/MP3");
        assert_eq!(params.loudness_target_level, Some(-14));
        assert_eq!(params.enhancement_level, Some(1.0));
        assert_eq!(params.transcode_kind, TranscodeKind::Mp3);
    }

    #[test]
    fn test_custom_params_are_used_verbatim() {
        let custom = CustomParams {
            loudness_target_level: None,
            loudness_peak_limit: Some(-3),
            enhancement_level: None,
        };
        let params = EnhancementParams::resolve(CUSTOM_PRESET, Some(&custom), "audio/mp3");
        let fields = params.form_fields();
        assert_eq!(
            fields,
            vec![
                ("loudness_peak_limit", "-3".to_string()),
                ("transcode_kind", "MP3".to_string()),
            ]
        );
    }

    #[test]
    fn test_transcode_kind_follows_mime_type() {
        assert_eq!(TranscodeKind::for_mime_type("audio/mp3"), TranscodeKind::Mp3);
        assert_eq!(TranscodeKind::for_mime_type("audio/x-mp3"), TranscodeKind::Mp3);
        assert_eq!(TranscodeKind::for_mime_type("audio/mpeg"), TranscodeKind::Wav);
        assert_eq!(TranscodeKind::for_mime_type("audio/wav"), TranscodeKind::Wav);
        assert_eq!(TranscodeKind::Mp3.extension(), "mp3");
    }

    #[test]
    fn test_preset_labels() {
        assert_eq!(preset_or_custom("radio").name, "Custom");
        assert_eq!(find_preset("youtube").unwrap().description, "YouTube standard loudness");
    }

    #[test]
    fn test_preset_table_serializes_in_order() {
        let json = serde_json::to_string(&PresetTable).unwrap();
        let first = json.find("instagram_story").unwrap();
        let last = json.find("\"custom\"").unwrap();
        assert!(first < last);
        assert!(json.contains("\"loudness_target\":-16"));
    }
}
