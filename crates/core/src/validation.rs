//! Field validation: the validator registry and the per-form runner.
//!
//! Validators are resolved by the type name declared in the schema. The
//! registry is verified against the schema when the coordinator is built, so
//! a schema referencing an unregistered validator type is a configuration
//! error surfaced at startup rather than a silent gap at submit time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use forms_types::{PatientRef, SessionMode};
use serde_json::Value;

use crate::document::value_is_filled;
use crate::error::{FormError, FormResult};
use crate::schema::{FormField, FormSchema};
use crate::session::SessionSnapshot;
use crate::submission::FormContext;

/// Severity of a single validation finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    Error,
    Warning,
}

/// One finding produced by a validator. Produced fresh on every pass and
/// never persisted beyond the current attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationResult {
    pub kind: ResultKind,
    pub message: String,
}

impl ValidationResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Warning,
            message: message.into(),
        }
    }
}

/// Context bundle handed to each validator invocation.
pub struct ValidatorContext<'a> {
    pub fields: &'a [FormField],
    pub values: &'a HashMap<String, Value>,
    pub patient: &'a PatientRef,
    pub mode: SessionMode,
    /// The declared parameters of the validator config being applied.
    pub params: &'a serde_json::Map<String, Value>,
}

/// A validator implementation, keyed in the registry by its type name.
#[async_trait]
pub trait FieldValidator: Send + Sync {
    async fn validate(
        &self,
        field: &FormField,
        value: &Value,
        ctx: &ValidatorContext<'_>,
    ) -> Vec<ValidationResult>;
}

/// Registry of validator implementations keyed by schema type name.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn FieldValidator>>,
}

impl ValidatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in validators registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("required", Arc::new(RequiredValidator));
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, validator: Arc<dyn FieldValidator>) {
        self.validators.insert(kind.into(), validator);
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn FieldValidator>> {
        self.validators.get(kind)
    }

    /// Startup-time configuration check: every validator type referenced by
    /// the given fields must have a registered implementation.
    pub fn verify_fields(&self, fields: &[FormField]) -> FormResult<()> {
        for field in fields {
            for config in &field.validators {
                if !self.validators.contains_key(&config.kind) {
                    return Err(FormError::UnknownValidator {
                        field_id: field.id.clone(),
                        validator_type: config.kind.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// [`verify_fields`](Self::verify_fields) across a whole schema.
    pub fn verify_schema(&self, schema: &FormSchema) -> FormResult<()> {
        let fields: Vec<FormField> = schema.fields().cloned().collect();
        self.verify_fields(&fields)
    }
}

/// Built-in `required` validator: blocks when a required field holds no
/// usable value.
pub struct RequiredValidator;

#[async_trait]
impl FieldValidator for RequiredValidator {
    async fn validate(
        &self,
        field: &FormField,
        value: &Value,
        _ctx: &ValidatorContext<'_>,
    ) -> Vec<ValidationResult> {
        if field.required.is_required() && !value_is_filled(value) {
            vec![ValidationResult::error("This field is required")]
        } else {
            Vec::new()
        }
    }
}

/// UI affordances raised by the runner.
#[derive(Default)]
pub struct ValidationHooks<'a> {
    /// Called with the first field (schema order) carrying errors after a
    /// failed pass. The shell scrolls it into view, focuses it, and applies
    /// a transient highlight.
    pub on_first_invalid: Option<&'a mut (dyn FnMut(&FormField) + Send)>,
}

/// Runs every configured validator chain for one form context.
///
/// Hidden, parent-hidden, disabled, and unspecified fields are skipped.
/// Findings are written to the context's field store; only `Error` results
/// block. Returns `false` iff any field produced a blocking error.
pub async fn validate_form(
    ctx: &mut FormContext,
    registry: &ValidatorRegistry,
    session: &SessionSnapshot,
    hooks: &mut ValidationHooks<'_>,
) -> bool {
    let FormContext {
        ref fields,
        ref values,
        ref mut store,
        ..
    } = *ctx;

    let mut any_errors = false;

    for field in fields {
        if field.is_hidden || field.is_parent_hidden || field.is_disabled {
            continue;
        }
        if store.is_unspecified(&field.id) {
            continue;
        }

        let value = values.get(&field.id).cloned().unwrap_or(Value::Null);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for config in &field.validators {
            let Some(validator) = registry.get(&config.kind) else {
                tracing::warn!(
                    field = %field.id,
                    validator = %config.kind,
                    "no validator registered for type, skipping"
                );
                continue;
            };

            let validator_ctx = ValidatorContext {
                fields,
                values,
                patient: &session.patient,
                mode: session.mode,
                params: &config.params,
            };

            for result in validator.validate(field, &value, &validator_ctx).await {
                match result.kind {
                    ResultKind::Error => errors.push(result),
                    ResultKind::Warning => warnings.push(result),
                }
            }
        }

        if !errors.is_empty() {
            any_errors = true;
        }
        store.record_results(&field.id, errors, warnings);
    }

    if any_errors {
        if let Some(on_first_invalid) = hooks.on_first_invalid.as_mut() {
            if let Some(first) = fields.iter().find(|field| store.has_errors(&field.id)) {
                on_first_invalid(first);
            }
        }
        return false;
    }

    true
}
