//! Submission coordination across the root form and its sub-forms.
//!
//! All participating forms register during a synchronous setup phase on
//! [`CoordinatorBuilder`]; building the coordinator seals the set and runs
//! the validator configuration check, so a submission can never race a
//! late-registering sub-form. Each attempt walks
//! `Idle → Validating → Submitting → Idle`, validating every context before
//! any processor runs and failing the whole attempt on the first processor
//! rejection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use forms_types::Notification;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::document::FieldData;
use crate::error::{FormError, FormResult, ProcessorFailure};
use crate::notification::NotificationSink;
use crate::post_submission::{self, PostSubmissionActionMeta};
use crate::schema::{FormField, FormSchema, OnSuccessBehavior};
use crate::session::SessionSnapshot;
use crate::store::FieldStore;
use crate::validation::{validate_form, ValidationHooks, ValidatorRegistry};

/// Opaque payload returned by a form processor, typically carrying the
/// identifiers of the records it created or updated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionResult(pub Value);

impl SubmissionResult {
    pub fn uuid(&self) -> Option<&str> {
        self.0.get("uuid").and_then(Value::as_str)
    }

    pub fn data(&self) -> Option<&Value> {
        self.0.get("data")
    }
}

/// Turns validated field values into persisted backend records.
///
/// Processors observe the shared cancellation token cooperatively: when it
/// fires they should stop as expediently as possible, though nothing
/// force-terminates non-cooperative work.
#[async_trait]
pub trait FormProcessor: Send + Sync {
    async fn process_submission(
        &self,
        ctx: &FormContext,
        cancel: CancellationToken,
    ) -> Result<SubmissionResult, ProcessorFailure>;
}

/// Live state of one form instance participating in a submission.
pub struct FormContext {
    pub form_id: String,
    /// Questions in declared schema order.
    pub fields: Vec<FormField>,
    /// Current values keyed by field id.
    pub values: HashMap<String, Value>,
    /// Submission state store for this form; single writer, subscribable.
    pub store: FieldStore,
    pub processor: Arc<dyn FormProcessor>,
}

impl FormContext {
    pub fn new(
        form_id: impl Into<String>,
        schema: &FormSchema,
        data: &FieldData,
        processor: Arc<dyn FormProcessor>,
    ) -> Self {
        Self::from_parts(
            form_id,
            schema.fields().cloned().collect(),
            data.value_map(),
            processor,
        )
    }

    pub fn from_parts(
        form_id: impl Into<String>,
        fields: Vec<FormField>,
        values: HashMap<String, Value>,
        processor: Arc<dyn FormProcessor>,
    ) -> Self {
        Self {
            form_id: form_id.into(),
            fields,
            values,
            store: FieldStore::new(),
            processor,
        }
    }

    /// First field in schema order carrying blocking errors.
    pub fn first_invalid_field(&self) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|field| self.store.has_errors(&field.id))
    }
}

/// Phase of the submission state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Submitting,
}

/// Outcome of one submission attempt.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// At least one form failed validation; nothing was submitted.
    Invalid,
    /// Every processor resolved; results are in form registration order
    /// (root first).
    Submitted {
        results: Vec<SubmissionResult>,
        on_success: OnSuccessBehavior,
    },
    /// A processor rejected; sibling work was abandoned.
    Failed,
}

/// Wiring the UI shell supplies to the coordinator.
#[derive(Default)]
pub struct CoordinatorHooks {
    /// Scroll/focus/highlight affordance for the first invalid field.
    pub focus_invalid: Option<Box<dyn FnMut(&FormField) + Send>>,
    /// Clears the form-collapse gating after a successful submission.
    pub hide_collapse_toggle: Option<Box<dyn Fn() + Send + Sync>>,
    /// Completion callback; when absent the close hook runs instead.
    pub on_complete: Option<Box<dyn Fn(&[SubmissionResult]) + Send + Sync>>,
    /// Default close action.
    pub handle_close: Option<Box<dyn Fn() + Send + Sync>>,
}

/// Synchronous setup phase for a submission unit.
///
/// Registration is last-writer-wins per form id; sub-form order is the
/// order of first registration.
pub struct CoordinatorBuilder {
    session: SessionSnapshot,
    registry: ValidatorRegistry,
    sink: Arc<dyn NotificationSink>,
    root: Option<FormContext>,
    sub_forms: Vec<(String, FormContext)>,
    post_actions: Vec<PostSubmissionActionMeta>,
    on_success: OnSuccessBehavior,
    hooks: CoordinatorHooks,
}

impl CoordinatorBuilder {
    pub fn new(
        session: SessionSnapshot,
        registry: ValidatorRegistry,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            session,
            registry,
            sink,
            root: None,
            sub_forms: Vec::new(),
            post_actions: Vec::new(),
            on_success: OnSuccessBehavior::default(),
            hooks: CoordinatorHooks::default(),
        }
    }

    pub fn root_form(mut self, ctx: FormContext) -> Self {
        self.root = Some(ctx);
        self
    }

    pub fn sub_form(mut self, form_id: impl Into<String>, ctx: FormContext) -> Self {
        let form_id = form_id.into();
        if let Some(slot) = self.sub_forms.iter_mut().find(|(id, _)| *id == form_id) {
            slot.1 = ctx;
        } else {
            self.sub_forms.push((form_id, ctx));
        }
        self
    }

    pub fn post_submission_actions(mut self, actions: Vec<PostSubmissionActionMeta>) -> Self {
        self.post_actions = actions;
        self
    }

    pub fn on_success(mut self, behavior: OnSuccessBehavior) -> Self {
        self.on_success = behavior;
        self
    }

    pub fn hooks(mut self, hooks: CoordinatorHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Seals registration. Fails if no root form was registered or if any
    /// registered context references an unknown validator type.
    pub fn build(self) -> FormResult<SubmissionCoordinator> {
        let root = self.root.ok_or(FormError::MissingRootForm)?;

        self.registry.verify_fields(&root.fields)?;
        for (_, ctx) in &self.sub_forms {
            self.registry.verify_fields(&ctx.fields)?;
        }

        Ok(SubmissionCoordinator {
            session: self.session,
            registry: self.registry,
            sink: self.sink,
            root,
            sub_forms: self.sub_forms,
            post_actions: self.post_actions,
            on_success: self.on_success,
            hooks: self.hooks,
            phase: SubmissionPhase::Idle,
            cancellation: None,
        })
    }
}

/// Coordinates validation and submission of a sealed set of forms.
pub struct SubmissionCoordinator {
    session: SessionSnapshot,
    registry: ValidatorRegistry,
    sink: Arc<dyn NotificationSink>,
    root: FormContext,
    sub_forms: Vec<(String, FormContext)>,
    post_actions: Vec<PostSubmissionActionMeta>,
    on_success: OnSuccessBehavior,
    hooks: CoordinatorHooks,
    phase: SubmissionPhase,
    cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl SubmissionCoordinator {
    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    /// Registered sub-form ids, in registration order.
    pub fn sub_form_ids(&self) -> Vec<&str> {
        self.sub_forms.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// The cancellation token of the current or most recent attempt.
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Runs one submission attempt end to end.
    ///
    /// Validates the root form and every sub-form (registration order); if
    /// all pass, invokes every processor concurrently under a fresh
    /// cancellation token. Emits exactly one success or failure notification
    /// per attempt and runs post-submission actions only after full success.
    pub async fn submit(&mut self) -> FormResult<SubmissionOutcome> {
        if self.phase != SubmissionPhase::Idle {
            return Err(FormError::SubmissionInProgress);
        }

        self.phase = SubmissionPhase::Validating;
        tracing::debug!(form = %self.root.form_id, "validating submission unit");

        if !self.validate_all().await {
            self.phase = SubmissionPhase::Idle;
            return Ok(SubmissionOutcome::Invalid);
        }

        self.phase = SubmissionPhase::Submitting;
        let cancel = CancellationToken::new();
        self.cancellation = Some(cancel.clone());

        let result = {
            let mut contexts: Vec<&FormContext> = Vec::with_capacity(1 + self.sub_forms.len());
            contexts.push(&self.root);
            contexts.extend(self.sub_forms.iter().map(|(_, ctx)| ctx));

            try_join_all(
                contexts
                    .into_iter()
                    .map(|ctx| ctx.processor.process_submission(ctx, cancel.clone())),
            )
            .await
        };

        self.phase = SubmissionPhase::Idle;

        match result {
            Ok(results) => {
                self.sink.show(self.success_notification());

                post_submission::run(
                    &self.post_actions,
                    &results,
                    &self.session,
                    self.sink.as_ref(),
                )
                .await;

                if let Some(hide) = &self.hooks.hide_collapse_toggle {
                    hide();
                }
                if let Some(on_complete) = &self.hooks.on_complete {
                    on_complete(&results);
                } else if let Some(close) = &self.hooks.handle_close {
                    close();
                }

                Ok(SubmissionOutcome::Submitted {
                    results,
                    on_success: self.on_success.clone(),
                })
            }
            Err(failure) => {
                // Abandon whatever sibling processors are still running.
                cancel.cancel();
                tracing::error!(%failure, "form submission failed");

                let notification = match failure {
                    ProcessorFailure::Toast(descriptor) => descriptor,
                    ProcessorFailure::Message(message) => {
                        Notification::error("Error processing form submission", message).critical()
                    }
                };
                self.sink.show(notification);

                Ok(SubmissionOutcome::Failed)
            }
        }
    }

    /// Cancels the active attempt's token. Idempotent; also runs on drop.
    pub fn teardown(&mut self) {
        if let Some(cancel) = self.cancellation.take() {
            cancel.cancel();
        }
    }

    async fn validate_all(&mut self) -> bool {
        let mut hooks = ValidationHooks {
            on_first_invalid: self
                .hooks
                .focus_invalid
                .as_mut()
                .map(|cb| cb.as_mut() as &mut (dyn FnMut(&FormField) + Send)),
        };

        if !validate_form(&mut self.root, &self.registry, &self.session, &mut hooks).await {
            return false;
        }
        for (_, ctx) in self.sub_forms.iter_mut() {
            if !validate_form(ctx, &self.registry, &self.session, &mut hooks).await {
                return false;
            }
        }
        true
    }

    fn success_notification(&self) -> Notification {
        if self.session.mode == forms_types::SessionMode::Edit {
            Notification::success("Record updated", "The patient encounter was updated")
        } else {
            Notification::success("Form submitted", "Form submitted successfully")
        }
    }
}

impl Drop for SubmissionCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
