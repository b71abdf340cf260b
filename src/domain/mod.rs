//! Domain types for the capture pipeline.
//!
//! This module contains the core data structures:
//! - Capture: the incoming image payload
//! - Description: vision output, including the "no subject" sentinel
//! - Entry: structured attributes plus enrichment, the persisted unit
//! - Owner: the identity entries are created for
//! - Voice: speech-synthesis job state
//! - Response: request/response envelopes

pub mod capture;
pub mod description;
pub mod entry;
pub mod owner;
pub mod response;
pub mod voice;

// Re-export commonly used types
pub use capture::{mime_type_for_extension, Capture, CaptureError, ImagePayload};
pub use description::{Description, NO_SUBJECT};
pub use entry::{Attributes, Entry, EntryType, UNIDENTIFIABLE_OBJECT, UNKNOWN};
pub use owner::Owner;
pub use response::{CreateEntryRequest, CreateEntryResponse, VoiceStatusRequest, VoiceStatusResponse};
pub use voice::{
    audio_url_for, SubmittedJob, SynthesizedVoice, VoiceJob, VoiceStatus, VoiceUpdate,
    VOICE_STORAGE_BASE,
};
