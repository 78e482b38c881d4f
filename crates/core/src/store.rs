//! Per-field submission state store.
//!
//! Validation findings flow through a single writer (the store owned by each
//! form context) and readers subscribe to change events, instead of several
//! components mutating a shared field record in place.

use std::collections::HashMap;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::validation::ValidationResult;

/// Mutable submission state of one field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldState {
    /// Blocking findings, in validator invocation order.
    pub errors: Vec<ValidationResult>,
    /// Non-blocking findings, in validator invocation order.
    pub warnings: Vec<ValidationResult>,
    /// The user explicitly marked the field as unspecified; validation
    /// skips it.
    pub unspecified: bool,
}

/// Change notification delivered to store subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldEvent {
    /// The field's submission state was replaced.
    Updated { field_id: String, state: FieldState },
    /// The field entered the invalid set for the current attempt.
    MarkedInvalid { field_id: String },
}

/// Submission state for every field of one form, keyed by field id.
#[derive(Debug, Default)]
pub struct FieldStore {
    states: HashMap<String, FieldState>,
    subscribers: Vec<UnboundedSender<FieldEvent>>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reader. Closed receivers are pruned on the next emit.
    pub fn subscribe(&mut self) -> UnboundedReceiver<FieldEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn state(&self, field_id: &str) -> Option<&FieldState> {
        self.states.get(field_id)
    }

    pub fn has_errors(&self, field_id: &str) -> bool {
        self.states
            .get(field_id)
            .is_some_and(|state| !state.errors.is_empty())
    }

    pub fn is_unspecified(&self, field_id: &str) -> bool {
        self.states
            .get(field_id)
            .is_some_and(|state| state.unspecified)
    }

    pub fn set_unspecified(&mut self, field_id: &str, unspecified: bool) {
        let state = self.states.entry(field_id.to_owned()).or_default();
        state.unspecified = unspecified;
        let state = state.clone();
        self.emit(FieldEvent::Updated {
            field_id: field_id.to_owned(),
            state,
        });
    }

    /// Replaces the findings for a field with the results of the latest
    /// validation pass. Emits an update event, plus an invalid-set event
    /// when the field has at least one blocking error.
    pub fn record_results(
        &mut self,
        field_id: &str,
        errors: Vec<ValidationResult>,
        warnings: Vec<ValidationResult>,
    ) {
        let state = self.states.entry(field_id.to_owned()).or_default();
        state.errors = errors;
        state.warnings = warnings;
        let state = state.clone();
        let invalid = !state.errors.is_empty();

        self.emit(FieldEvent::Updated {
            field_id: field_id.to_owned(),
            state,
        });
        if invalid {
            self.emit(FieldEvent::MarkedInvalid {
                field_id: field_id.to_owned(),
            });
        }
    }

    /// Field ids currently carrying blocking errors.
    pub fn invalid_field_ids(&self) -> Vec<String> {
        self.states
            .iter()
            .filter(|(_, state)| !state.errors.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn emit(&mut self, event: FieldEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationResult;

    #[test]
    fn record_results_notifies_subscribers() {
        let mut store = FieldStore::new();
        let mut rx = store.subscribe();

        store.record_results(
            "weight",
            vec![ValidationResult::error("This field is required")],
            vec![],
        );

        let updated = rx.try_recv().expect("updated event");
        assert!(matches!(updated, FieldEvent::Updated { ref field_id, .. } if field_id == "weight"));
        let invalid = rx.try_recv().expect("invalid event");
        assert_eq!(
            invalid,
            FieldEvent::MarkedInvalid {
                field_id: "weight".into()
            }
        );
    }

    #[test]
    fn clean_pass_replaces_stale_errors() {
        let mut store = FieldStore::new();
        store.record_results(
            "weight",
            vec![ValidationResult::error("This field is required")],
            vec![],
        );
        assert!(store.has_errors("weight"));

        store.record_results("weight", vec![], vec![]);
        assert!(!store.has_errors("weight"));
        assert!(store.invalid_field_ids().is_empty());
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let mut store = FieldStore::new();
        let rx = store.subscribe();
        drop(rx);

        store.record_results("weight", vec![], vec![]);
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn unspecified_flag_survives_validation_passes() {
        let mut store = FieldStore::new();
        store.set_unspecified("height", true);
        store.record_results("height", vec![], vec![]);
        assert!(store.is_unspecified("height"));
    }
}
