//! Request and response envelopes for the create-entry and voice-status flows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::capture::Capture;
use super::entry::Entry;

/// Create-entry request: `{ "capture": { "image": "<data URI>" } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub capture: Capture,
}

/// Create-entry response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryResponse {
    pub success: bool,

    pub entry: Entry,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateEntryResponse {
    pub fn ok(entry: Entry) -> Self {
        Self {
            success: true,
            entry,
            error: None,
        }
    }

    /// Failure envelope with a placeholder entry
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            entry: Entry::placeholder_error(error.clone()),
            error: Some(error),
        }
    }

    /// HTTP status a transport layer should use (fatal failures are 500)
    pub fn status_code(&self) -> u16 {
        if self.success {
            200
        } else {
            500
        }
    }
}

/// Voice-status request: `{ "capture": <entry-like object> }`.
///
/// Kept as raw JSON so the refresh can echo unknown fields untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStatusRequest {
    pub capture: Value,
}

/// Voice-status response; always status 200
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStatusResponse {
    pub capture: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_envelope() {
        let response = CreateEntryResponse::failure("image archive failed: 401");
        assert!(!response.success);
        assert_eq!(response.status_code(), 500);
        assert_eq!(response.error.as_deref(), Some("image archive failed: 401"));
        assert_eq!(response.entry.attributes.description, "image archive failed: 401");

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["entry"]["object"], "Error");
    }

    #[test]
    fn test_ok_envelope_omits_error() {
        let response = CreateEntryResponse::ok(Entry::unidentified("No object identified."));
        assert_eq!(response.status_code(), 200);
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["entry"]["object"], "Unidentifiable Object");
    }

    #[test]
    fn test_request_parse() {
        let request: CreateEntryRequest =
            serde_json::from_str(r#"{"capture": {"image": "data:image/png;base64,AA=="}}"#).unwrap();
        assert_eq!(request.capture.image, "data:image/png;base64,AA==");
    }
}
