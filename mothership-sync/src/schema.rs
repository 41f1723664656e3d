//! Typed view of the backend config document
//!
//! The backend stores one loosely-typed JSON tree. These types pin down the
//! sections the studio edits and are checked once when the document is
//! loaded; unknown keys are kept so a round trip never loses data.
//!
//! Defaults mirror what the studio shows when a section is missing. Leaves
//! are read leniently: a `null` leaf takes its default and number inputs may
//! arrive as fractions or strings. Only a section of the wrong shape is a
//! schema error.

use crate::error::{SyncError, SyncResult};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Whole config document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub music: MusicSettings,
    #[serde(default)]
    pub captions: CaptionSettings,
    #[serde(default)]
    pub prompts: BTreeMap<String, PromptCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_genre: Option<String>,
    /// Sections the studio does not edit (ffmpeg, video_list, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Validate a raw document at the load boundary
    pub fn from_value(value: &Value) -> SyncResult<Self> {
        if !value.is_object() {
            return Err(SyncError::Schema(format!(
                "expected an object at the root, got {}",
                json_kind(value)
            )));
        }
        decode_lenient(value)
    }
}

/// Decode a section, letting `null` leaves fall back to their defaults
pub fn decode_lenient<T: DeserializeOwned>(value: &Value) -> SyncResult<T> {
    let mut value = value.clone();
    strip_nulls(&mut value);
    serde_json::from_value(value).map_err(|e| SyncError::Schema(e.to_string()))
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(strip_nulls);
        }
        _ => {}
    }
}

/// A number typed into a form field: integer, fraction or numeric string.
/// Anything else reads as absent.
fn form_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

fn story_arc_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(form_number(deserializer)?
        .map(|n| n.round().clamp(0.0, u32::MAX as f64) as u32)
        .unwrap_or(DEFAULT_STORY_ARC_COUNT))
}

fn level<'de, D>(deserializer: D, fallback: u8) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(form_number(deserializer)?
        .map(|n| n.round().clamp(0.0, u8::MAX as f64) as u8)
        .unwrap_or(fallback))
}

fn creativity_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    level(deserializer, DEFAULT_CREATIVITY_LEVEL)
}

fn clarity_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    level(deserializer, DEFAULT_CLARITY_LEVEL)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `audio` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default)]
    pub voice: VoiceSettings,
    #[serde(default = "default_pause_factor")]
    pub pause_factor: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            voice: VoiceSettings::default(),
            pause_factor: default_pause_factor(),
            extra: Map::new(),
        }
    }
}

pub const DEFAULT_PAUSE_FACTOR: f64 = 0.25;

fn default_pause_factor() -> f64 {
    DEFAULT_PAUSE_FACTOR
}

/// TTS voice parameters (`audio.voice`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub voice_id: String,
    pub model_id: String,
    pub stability: f64,
    pub similarity_boost: f64,
    pub speed: f64,
    pub use_speaker_boost: bool,
    pub output_format: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: "AvUYKSeryCcU2BHSM8x7".to_string(),
            model_id: "eleven_flash_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            speed: 1.15,
            use_speaker_boost: true,
            output_format: "mp3_44100_128".to_string(),
        }
    }
}

/// Background music start offset.
///
/// The backend stores seconds; older documents may still hold `"M:SS"`.
/// Any other value reads as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StartTime {
    Seconds(f64),
    Display(String),
}

impl<'de> Deserialize<'de> for StartTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => StartTime::Seconds(n.as_f64().unwrap_or(0.0)),
            Value::String(text) => StartTime::Display(text),
            _ => StartTime::default(),
        })
    }
}

impl Default for StartTime {
    fn default() -> Self {
        StartTime::Seconds(0.0)
    }
}

impl StartTime {
    /// Offset in whole seconds, the form the backend expects
    pub fn seconds(&self) -> u64 {
        match self {
            StartTime::Seconds(secs) if secs.is_finite() && *secs > 0.0 => secs.floor() as u64,
            StartTime::Seconds(_) => 0,
            StartTime::Display(text) => parse_start_time(text),
        }
    }

    /// `M:SS` form shown next to the slider
    pub fn display(&self) -> String {
        match self {
            StartTime::Display(text) => text.clone(),
            StartTime::Seconds(_) => format_start_time(self.seconds()),
        }
    }
}

/// Parse `"M:SS"` into seconds.
///
/// Each component is read up to its first non-digit; an unreadable component
/// counts as zero, so `"abc"` is `0` and `"2"` is two minutes.
pub fn parse_start_time(text: &str) -> u64 {
    let mut parts = text.trim().split(':');
    let minutes = parts.next().map(leading_number).unwrap_or(0);
    let seconds = parts.next().map(leading_number).unwrap_or(0);
    minutes.saturating_mul(60).saturating_add(seconds)
}

fn leading_number(part: &str) -> u64 {
    let digits: String = part
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Render seconds as `M:SS`
pub fn format_start_time(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// `music` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    pub track_id: String,
    pub start_time: StartTime,
    pub trim_audio: f64,
    pub volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            track_id: "Otv8MxIiv80".to_string(),
            start_time: StartTime::default(),
            trim_audio: 0.0,
            volume: 0.2,
            custom_title: None,
        }
    }
}

/// Caption look
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    #[default]
    Default,
    Modern,
    Vibrant,
}

impl CaptionStyle {
    pub const ALL: [CaptionStyle; 3] = [CaptionStyle::Default, CaptionStyle::Modern, CaptionStyle::Vibrant];

    pub fn name(&self) -> &'static str {
        match self {
            CaptionStyle::Default => "default",
            CaptionStyle::Modern => "modern",
            CaptionStyle::Vibrant => "vibrant",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

/// `captions` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    pub enabled: bool,
    pub style: CaptionStyle,
}

/// Which half of a prompt category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Creative,
    Polish,
}

impl PromptKind {
    pub fn key(&self) -> &'static str {
        match self {
            PromptKind::Creative => "creative",
            PromptKind::Polish => "polish",
        }
    }
}

pub const DEFAULT_STORY_ARC_COUNT: u32 = 1;
pub const DEFAULT_CREATIVITY_LEVEL: u8 = 7;
pub const DEFAULT_CLARITY_LEVEL: u8 = 8;

/// One entry of `prompts.<category>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptCategory {
    pub creative: CreativePrompt,
    pub polish: PolishPrompt,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreativePrompt {
    pub prompt: String,
    #[serde(deserialize_with = "story_arc_count")]
    pub story_arc_count: u32,
    pub depth_of_mothership: String,
    pub action_level: String,
    pub favorite_videos: Vec<String>,
    pub tone: String,
    pub style: String,
    #[serde(deserialize_with = "creativity_level")]
    pub creativity_level: u8,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CreativePrompt {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            story_arc_count: DEFAULT_STORY_ARC_COUNT,
            depth_of_mothership: "medium".to_string(),
            action_level: "high".to_string(),
            favorite_videos: Vec::new(),
            tone: "professional".to_string(),
            style: "narrative".to_string(),
            creativity_level: DEFAULT_CREATIVITY_LEVEL,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolishPrompt {
    pub prompt: String,
    pub duration: String,
    pub follow_creative: String,
    pub specific_commands: Vec<String>,
    pub pacing: String,
    pub target_audience: String,
    #[serde(deserialize_with = "clarity_level")]
    pub clarity_level: u8,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PolishPrompt {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            duration: "60sec".to_string(),
            follow_creative: "high".to_string(),
            specific_commands: Vec::new(),
            pacing: "medium".to_string(),
            target_audience: "general".to_string(),
            clarity_level: DEFAULT_CLARITY_LEVEL,
            extra: Map::new(),
        }
    }
}

/// Last submitted free-text fields (`/api/config/memory`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mothership: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_prompt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemoryDocument {
    pub fn from_value(value: &Value) -> SyncResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        decode_lenient(value)
    }

    /// Saved mothership text, treating an empty string as absent
    pub fn mothership(&self) -> Option<&str> {
        self.last_mothership.as_deref().filter(|s| !s.is_empty())
    }

    /// Saved prompt text, treating an empty string as absent
    pub fn prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref().filter(|s| !s.is_empty())
    }
}
