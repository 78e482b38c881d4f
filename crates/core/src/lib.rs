//! # Forms Core
//!
//! Submission and validation orchestration for clinical forms.
//!
//! This crate owns the logic between a rendered form and the backend
//! collaborators that persist it:
//! - value collection from a rendered document snapshot ([`document`])
//! - per-field validator chains against a registry ([`validation`])
//! - coordinated submission of a root form plus sub-forms with shared
//!   cancellation ([`submission`])
//! - conditionally-enabled post-submission side effects ([`post_submission`])
//!
//! **No rendering concerns**: widgets, layout, and translation live in the
//! UI shell, which talks to this crate through [`DocumentSnapshot`],
//! [`NotificationSink`], and the processor/action traits.

pub mod document;
pub mod error;
pub mod expression;
pub mod notification;
pub mod post_submission;
pub mod schema;
pub mod session;
pub mod store;
pub mod submission;
pub mod validation;

pub use document::{collect, CollectedField, DocumentSnapshot, FieldData, RenderedControl};
pub use error::{FormError, FormResult, ProcessorFailure};
pub use notification::{NotificationSink, TracingSink};
pub use post_submission::{PostActionContext, PostSubmissionAction, PostSubmissionActionMeta};
pub use schema::{FormField, FormSchema, OnSuccessBehavior, ValidatorConfig};
pub use session::SessionSnapshot;
pub use store::{FieldEvent, FieldState, FieldStore};
pub use submission::{
    CoordinatorBuilder, CoordinatorHooks, FormContext, FormProcessor, SubmissionCoordinator,
    SubmissionOutcome, SubmissionPhase, SubmissionResult,
};
pub use validation::{
    validate_form, FieldValidator, ValidationHooks, ValidationResult, ValidatorContext,
    ValidatorRegistry,
};

pub use forms_types as types;
