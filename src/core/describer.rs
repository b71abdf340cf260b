//! Vision step: image to natural-language description.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::adapters::GenerativeModel;
use crate::domain::{Capture, Description};

const VISION_PROMPT: &str = "You are a Pokedex. Identify the primary object, creature, or person in this image. \
If it is a Pokemon, identify it by name. \
If it is an inanimate object, describe it. \
If it is a person, describe them generally (e.g., 'A human male'). \
Provide a brief, encyclopedia-style description (3-4 sentences). \
DO NOT say 'No object identified.' unless the image is completely black or purely noise.";

/// Diagnostic shown to callers when the vision provider errors
pub const VISION_UNAVAILABLE: &str = "vision provider unavailable";

/// Describes captured images; never fails
pub struct VisionDescriber {
    model: Arc<dyn GenerativeModel>,
}

impl VisionDescriber {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Describe the capture.
    ///
    /// Undecodable payloads and provider failures come back as the sentinel
    /// with a diagnostic attached. Provider errors are logged in full but
    /// only surface as [`VISION_UNAVAILABLE`].
    #[instrument(skip_all, fields(provider = self.model.name()))]
    pub async fn describe(&self, capture: &Capture) -> Description {
        let payload = match capture.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Capture is not a decodable image");
                return Description::no_subject(Some(e.to_string()));
            }
        };

        match self.model.generate(VISION_PROMPT, Some(&payload)).await {
            Ok(text) => {
                let description = Description::from_model_text(&text);
                debug!(sentinel = description.is_sentinel(), "Image described");
                description
            }
            Err(e) => {
                warn!(error = %super::describe_error(&e), "Vision model call failed");
                Description::no_subject(Some(VISION_UNAVAILABLE.to_string()))
            }
        }
    }
}
