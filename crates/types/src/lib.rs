//! Shared domain types for the clinical forms engine.
//!
//! Small value types that cross crate boundaries: session descriptors,
//! lightweight references to backend resources, and the notification
//! payloads handed to the UI shell. Nothing in here carries behaviour
//! beyond parsing and display.

use serde::{Deserialize, Serialize};

/// Errors produced by validated text newtypes.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input was empty or contained only whitespace.
    #[error("text cannot be empty")]
    Empty,
}

/// A string that is guaranteed to hold at least one non-whitespace character.
///
/// Input is trimmed on construction; an empty trimmed result is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NonEmptyText {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors produced when parsing session descriptors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown session mode: {0}")]
    UnknownMode(String),
}

/// The read/write affordance a form session was opened with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Capturing a new record.
    Enter,
    /// Amending an existing record.
    Edit,
    /// Read-only review.
    View,
    /// Read-only, rendered inside another view.
    EmbeddedView,
}

impl SessionMode {
    /// Whether the session permits writes.
    pub fn is_readonly(self) -> bool {
        matches!(self, SessionMode::View | SessionMode::EmbeddedView)
    }
}

impl std::str::FromStr for SessionMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enter" => Ok(SessionMode::Enter),
            "edit" => Ok(SessionMode::Edit),
            "view" => Ok(SessionMode::View),
            "embedded-view" => Ok(SessionMode::EmbeddedView),
            other => Err(SessionError::UnknownMode(other.to_owned())),
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionMode::Enter => "enter",
            SessionMode::Edit => "edit",
            SessionMode::View => "view",
            SessionMode::EmbeddedView => "embedded-view",
        };
        f.write_str(s)
    }
}

/// Minimal reference to the patient a form session is about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRef {
    pub uuid: String,
    #[serde(default)]
    pub display: Option<String>,
}

impl PatientRef {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            display: None,
        }
    }
}

/// Reference to an arbitrary backend resource (visit, location, provider).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub uuid: String,
    #[serde(default)]
    pub display: Option<String>,
}

/// Severity of a user-facing notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
}

/// A notification descriptor handed to the UI shell for display.
///
/// `low_contrast` maps to a muted snackbar presentation; `critical` marks
/// toasts that must not auto-dismiss.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub kind: NotificationKind,
    #[serde(default)]
    pub low_contrast: bool,
    #[serde(default)]
    pub critical: bool,
}

impl Notification {
    pub fn success(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: Some(subtitle.into()),
            kind: NotificationKind::Success,
            low_contrast: true,
            critical: false,
        }
    }

    pub fn error(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: Some(subtitle.into()),
            kind: NotificationKind::Error,
            low_contrast: false,
            critical: false,
        }
    }

    pub fn warning(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: Some(subtitle.into()),
            kind: NotificationKind::Warning,
            low_contrast: false,
            critical: false,
        }
    }

    /// Marks this notification as one that must stay on screen.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  weight  ").expect("valid text");
        assert_eq!(text.as_str(), "weight");
    }

    #[test]
    fn non_empty_text_rejects_whitespace_only() {
        let err = NonEmptyText::new("   ").expect_err("expected rejection");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn session_mode_round_trips_through_str() {
        for mode in [
            SessionMode::Enter,
            SessionMode::Edit,
            SessionMode::View,
            SessionMode::EmbeddedView,
        ] {
            let parsed: SessionMode = mode.to_string().parse().expect("valid mode");
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn session_mode_rejects_unknown_value() {
        let err = "review".parse::<SessionMode>().expect_err("expected failure");
        assert!(matches!(err, SessionError::UnknownMode(m) if m == "review"));
    }

    #[test]
    fn embedded_view_is_readonly() {
        assert!(SessionMode::EmbeddedView.is_readonly());
        assert!(SessionMode::View.is_readonly());
        assert!(!SessionMode::Enter.is_readonly());
        assert!(!SessionMode::Edit.is_readonly());
    }
}
