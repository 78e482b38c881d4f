//! Error types for the orchestration core.
//!
//! Per-field validation findings are not errors at this level; they are
//! recorded on the field store and surfaced inline. `FormError` covers
//! configuration problems and lifecycle misuse, `ProcessorFailure` is the
//! catch boundary for a rejected submission.

use forms_types::Notification;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no root form has been registered")]
    MissingRootForm,
    #[error("field `{field_id}` references unknown validator type `{validator_type}`")]
    UnknownValidator {
        field_id: String,
        validator_type: String,
    },
    #[error("a submission attempt is already in flight")]
    SubmissionInProgress,
    #[error("cannot evaluate expression `{expression}`: {reason}")]
    Expression { expression: String, reason: String },
}

pub type FormResult<T> = std::result::Result<T, FormError>;

/// A form processor rejected the submission.
///
/// Processors fail either with a plain message or with a ready-made
/// notification descriptor that the coordinator shows as-is.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorFailure {
    #[error("{0}")]
    Message(String),
    #[error("{}", .0.title)]
    Toast(Notification),
}
