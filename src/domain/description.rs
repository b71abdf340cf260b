//! Descriptions produced by the vision step.

use std::fmt;

/// Marker text meaning nothing identifiable is in the picture
pub const NO_SUBJECT: &str = "No object identified.";

/// Output of the vision step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    /// A genuine description of the captured subject
    Subject(String),

    /// Nothing identifiable; may carry a diagnostic explaining why
    NoSubject { diagnostic: Option<String> },
}

impl Description {
    pub fn no_subject(diagnostic: Option<String>) -> Self {
        Self::NoSubject { diagnostic }
    }

    /// Interpret raw model output.
    ///
    /// Empty output and any text containing the marker are treated as the
    /// sentinel, so a model that wraps the marker in extra words still
    /// short-circuits.
    pub fn from_model_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::no_subject(Some("model returned empty text".to_string()));
        }
        if text.contains(NO_SUBJECT) {
            return Self::no_subject(None);
        }
        Self::Subject(text.to_string())
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::NoSubject { .. })
    }

    /// The subject text, if any
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Subject(text) => Some(text),
            Self::NoSubject { .. } => None,
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject(text) => f.write_str(text),
            Self::NoSubject { diagnostic: None } => f.write_str(NO_SUBJECT),
            Self::NoSubject {
                diagnostic: Some(diagnostic),
            } => write!(f, "{} ({})", NO_SUBJECT, diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genuine_description() {
        let description = Description::from_model_text("  A golden retriever lying on grass.\n");
        assert_eq!(
            description.subject(),
            Some("A golden retriever lying on grass.")
        );
        assert!(!description.is_sentinel());
    }

    #[test]
    fn test_marker_anywhere_is_sentinel() {
        let description = Description::from_model_text("Sorry. No object identified. The image is black.");
        assert!(description.is_sentinel());
        assert_eq!(description.to_string(), NO_SUBJECT);
    }

    #[test]
    fn test_empty_text_is_sentinel() {
        let description = Description::from_model_text("   ");
        assert!(description.is_sentinel());
        assert!(description.to_string().starts_with(NO_SUBJECT));
    }

    #[test]
    fn test_diagnostic_rendering() {
        let description = Description::no_subject(Some("HTTP 503".to_string()));
        assert_eq!(description.to_string(), "No object identified. (HTTP 503)");
    }
}
