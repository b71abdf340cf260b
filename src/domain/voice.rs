//! Speech-synthesis jobs and their lifecycle.

use serde::{Deserialize, Serialize};

/// Public bucket that finished audio paths are relative to
pub const VOICE_STORAGE_BASE: &str = "https://storage.googleapis.com/vocodes-public";

/// Lifecycle of a speech-synthesis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceStatus {
    /// Accepted, waiting for a worker
    Pending,

    /// A worker is rendering audio
    Running,

    /// Audio is available
    CompleteSuccess,

    /// The job will not produce audio
    Failed,
}

impl VoiceStatus {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::CompleteSuccess => "complete_success",
            Self::Failed => "failed",
        }
    }

    /// Whether the job has reached a final state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CompleteSuccess | Self::Failed)
    }
}

/// A job accepted by the speech provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    /// Opaque job token
    pub job_token: String,

    /// Audio path, when the provider renders synchronously
    pub audio_path: Option<String>,
}

/// Polled state of a speech job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceJob {
    pub job_token: String,
    pub status: VoiceStatus,
    pub audio_url: Option<String>,
}

/// Voice data attached to an entry after a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedVoice {
    pub job_token: String,
    pub audio_url: Option<String>,
}

impl From<SubmittedJob> for SynthesizedVoice {
    fn from(job: SubmittedJob) -> Self {
        Self {
            job_token: job.job_token,
            audio_url: job.audio_path.as_deref().map(audio_url_for),
        }
    }
}

/// Voice fields written back by a status refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceUpdate {
    pub job_token: String,
    pub status: VoiceStatus,
    pub audio_url: Option<String>,
}

/// Turn a provider audio path into a public URL
pub fn audio_url_for(audio_path: &str) -> String {
    if audio_path.starts_with("http://") || audio_path.starts_with("https://") {
        return audio_path.to_string();
    }
    if audio_path.starts_with('/') {
        format!("{}{}", VOICE_STORAGE_BASE, audio_path)
    } else {
        format!("{}/{}", VOICE_STORAGE_BASE, audio_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_url_for_relative_path() {
        assert_eq!(
            audio_url_for("/media/a/b/out.wav"),
            "https://storage.googleapis.com/vocodes-public/media/a/b/out.wav"
        );
        assert_eq!(
            audio_url_for("media/out.wav"),
            "https://storage.googleapis.com/vocodes-public/media/out.wav"
        );
    }

    #[test]
    fn test_audio_url_for_absolute_url() {
        assert_eq!(
            audio_url_for("https://cdn.example.com/x.wav"),
            "https://cdn.example.com/x.wav"
        );
    }

    #[test]
    fn test_synthesized_voice_from_job() {
        let voice = SynthesizedVoice::from(SubmittedJob {
            job_token: "jinf_1".to_string(),
            audio_path: None,
        });
        assert_eq!(voice.job_token, "jinf_1");
        assert!(voice.audio_url.is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&VoiceStatus::CompleteSuccess).unwrap();
        assert_eq!(json, "\"complete_success\"");
        for status in [
            VoiceStatus::Pending,
            VoiceStatus::Running,
            VoiceStatus::CompleteSuccess,
            VoiceStatus::Failed,
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert!(VoiceStatus::Failed.is_terminal());
        assert!(!VoiceStatus::Running.is_terminal());
    }
}
