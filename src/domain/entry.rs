//! Catalog entries and the structured attributes they are built from.
//!
//! Field names on the wire follow the document layout clients already
//! consume (`_id`, `approximateWeight`, `$vector`, `no`, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::owner::Owner;
use super::voice::{SynthesizedVoice, VoiceStatus};

/// Placeholder used for unknown text fields
pub const UNKNOWN: &str = "Unknown";

/// Object name of the degraded entry
pub const UNIDENTIFIABLE_OBJECT: &str = "Unidentifiable Object";

/// Type tag drawn from the creature-type vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Normal,
    Fire,
    Water,
    Grass,
    Electric,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
    /// Not a living thing
    Inanimate,
    Unknown,
}

impl EntryType {
    pub const ALL: [EntryType; 20] = [
        Self::Normal,
        Self::Fire,
        Self::Water,
        Self::Grass,
        Self::Electric,
        Self::Ice,
        Self::Fighting,
        Self::Poison,
        Self::Ground,
        Self::Flying,
        Self::Psychic,
        Self::Bug,
        Self::Rock,
        Self::Ghost,
        Self::Dragon,
        Self::Dark,
        Self::Steel,
        Self::Fairy,
        Self::Inanimate,
        Self::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Fire => "Fire",
            Self::Water => "Water",
            Self::Grass => "Grass",
            Self::Electric => "Electric",
            Self::Ice => "Ice",
            Self::Fighting => "Fighting",
            Self::Poison => "Poison",
            Self::Ground => "Ground",
            Self::Flying => "Flying",
            Self::Psychic => "Psychic",
            Self::Bug => "Bug",
            Self::Rock => "Rock",
            Self::Ghost => "Ghost",
            Self::Dragon => "Dragon",
            Self::Dark => "Dark",
            Self::Steel => "Steel",
            Self::Fairy => "Fairy",
            Self::Inanimate => "Inanimate",
            Self::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything outside the vocabulary is `Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Ok(Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .unwrap_or(Self::Unknown))
    }
}

impl Serialize for EntryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Self::Unknown))
    }
}

impl Default for EntryType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Structured attributes generated from a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Object name; the dedup key together with the owner
    #[serde(alias = "name")]
    pub object: String,

    #[serde(default = "unknown")]
    pub species: String,

    #[serde(default = "unknown")]
    pub approximate_weight: String,

    #[serde(default = "unknown")]
    pub approximate_height: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub height: f64,

    #[serde(default, deserialize_with = "lenient_stat")]
    pub hp: u32,

    #[serde(default, deserialize_with = "lenient_stat")]
    pub attack: u32,

    #[serde(default, deserialize_with = "lenient_stat")]
    pub defense: u32,

    #[serde(default, deserialize_with = "lenient_stat")]
    pub speed: u32,

    #[serde(rename = "type", default)]
    pub kind: EntryType,

    /// Description the attributes were generated from
    #[serde(default)]
    pub description: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Accept numbers, numeric strings, and strings with units ("15 kg")
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Missing(Option<()>),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) if n.is_finite() => Ok(n),
        Raw::Number(n) => Err(de::Error::custom(format!("non-finite number {}", n))),
        Raw::Text(text) => Ok(leading_number(&text).unwrap_or(0.0)),
        Raw::Missing(_) => Ok(0.0),
    }
}

fn lenient_stat<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = lenient_f64(deserializer)?;
    Ok(value.round().clamp(0.0, u32::MAX as f64) as u32)
}

/// Leading number of `text`, ignoring thousands separators ("1,000 kg")
fn leading_number(text: &str) -> Option<f64> {
    let text: String = text.trim().chars().filter(|c| *c != ',').collect();
    let end = text
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

/// A catalog entry as returned to callers and stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(flatten)]
    pub attributes: Attributes,

    #[serde(rename = "$vector", default, skip_serializing_if = "Vec::is_empty")]
    pub vector: Vec<f32>,

    /// Archived image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Global sequence number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_job_token: Option<String>,

    #[serde(rename = "voiceUrl", default, skip_serializing_if = "Option::is_none")]
    pub voice_url: Option<String>,

    #[serde(rename = "voiceStatus", default, skip_serializing_if = "Option::is_none")]
    pub voice_status: Option<VoiceStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    #[serde(rename = "userAvatar", default, skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Wrap attributes with no enrichment attached yet
    pub fn from_attributes(attributes: Attributes) -> Self {
        Self {
            attributes,
            vector: Vec::new(),
            image: None,
            no: None,
            inference_job_token: None,
            voice_url: None,
            voice_status: None,
            user_id: None,
            user_name: None,
            user_avatar: None,
            created_at: None,
        }
    }

    /// Merge the phase-two outputs into a candidate entry
    pub fn assemble(
        attributes: Attributes,
        vector: Vec<f32>,
        image_url: String,
        no: u64,
        voice: Option<SynthesizedVoice>,
    ) -> Self {
        let mut entry = Self::from_attributes(attributes);
        entry.vector = vector;
        entry.image = Some(image_url);
        entry.no = Some(no);
        entry.created_at = Some(Utc::now());
        if let Some(voice) = voice {
            entry.inference_job_token = Some(voice.job_token);
            entry.voice_status = Some(if voice.audio_url.is_some() {
                VoiceStatus::CompleteSuccess
            } else {
                VoiceStatus::Pending
            });
            entry.voice_url = voice.audio_url;
        }
        entry
    }

    /// Fixed entry returned when nothing identifiable was captured
    pub fn unidentified(description: impl Into<String>) -> Self {
        Self::placeholder(UNIDENTIFIABLE_OBJECT, description.into())
    }

    /// Placeholder carried by failure responses
    pub fn placeholder_error(message: impl Into<String>) -> Self {
        Self::placeholder("Error", message.into())
    }

    fn placeholder(object: &str, description: String) -> Self {
        Self::from_attributes(Attributes {
            id: Uuid::nil(),
            object: object.to_string(),
            species: unknown(),
            approximate_weight: unknown(),
            approximate_height: unknown(),
            weight: 0.0,
            height: 0.0,
            hp: 0,
            attack: 0,
            defense: 0,
            speed: 0,
            kind: EntryType::Unknown,
            description,
        })
    }

    /// Stamp owner fields onto the entry
    pub fn with_owner(mut self, owner: &Owner) -> Self {
        self.user_id = Some(owner.id.clone());
        self.user_name = Some(owner.name.clone());
        self.user_avatar = owner.avatar.clone();
        self
    }

    pub fn id(&self) -> Uuid {
        self.attributes.id
    }

    pub fn object(&self) -> &str {
        &self.attributes.object
    }

    /// Whether any voice field is set
    pub fn has_voice(&self) -> bool {
        self.inference_job_token.is_some() || self.voice_url.is_some() || self.voice_status.is_some()
    }
}
