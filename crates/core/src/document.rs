//! Field value collection from a rendered document snapshot.
//!
//! The UI shell captures the state of its rendered inputs into a
//! [`DocumentSnapshot`]; the collector reconciles that against the form
//! schema to decide what is filled and what is required. Pure computation
//! over the snapshot: no side effects, identical output for identical input.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::schema::FormSchema;

/// The kind of rendered control, as reported by the UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Radio,
    Checkbox,
    Other,
}

/// One rendered input element.
///
/// Radio and checkbox elements belonging to the same group share a `name`;
/// the collector folds such groups into a single field entry.
#[derive(Clone, Debug)]
pub struct RenderedControl {
    pub name: String,
    pub kind: ControlKind,
    /// The option value carried by this element, or the current input value
    /// for free-form controls.
    pub value: Value,
    /// Whether this element is selected. Meaningful for radio/checkbox only.
    pub checked: bool,
    pub label: Option<String>,
    /// The associated label carries a visual required marker.
    pub label_required_marker: bool,
}

impl RenderedControl {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ControlKind::Other,
            value: Value::String(value.into()),
            checked: false,
            label: None,
            label_required_marker: false,
        }
    }

    pub fn radio(name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
        Self {
            name: name.into(),
            kind: ControlKind::Radio,
            value: Value::String(value.into()),
            checked,
            label: None,
            label_required_marker: false,
        }
    }

    pub fn checkbox(name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
        Self {
            name: name.into(),
            kind: ControlKind::Checkbox,
            value: Value::String(value.into()),
            checked,
            label: None,
            label_required_marker: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>, required_marker: bool) -> Self {
        self.label = Some(label.into());
        self.label_required_marker = required_marker;
        self
    }
}

/// Immutable capture of the rendered inputs, in document order.
#[derive(Clone, Debug, Default)]
pub struct DocumentSnapshot {
    pub controls: Vec<RenderedControl>,
}

impl DocumentSnapshot {
    pub fn new(controls: Vec<RenderedControl>) -> Self {
        Self { controls }
    }
}

/// Collection outcome for one field.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectedField {
    pub field_id: String,
    pub label: String,
    pub value: Value,
    pub is_filled: bool,
    pub is_required: bool,
    /// Index of the contributing control in the snapshot, usable by the UI
    /// shell as a scroll/focus target.
    pub control_index: usize,
}

/// Summary entry kept in the by-id map.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldEntry {
    pub value: Value,
    pub is_filled: bool,
    pub is_required: bool,
}

/// Ordered collection results plus a by-id lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldData {
    pub fields: Vec<CollectedField>,
    pub by_id: HashMap<String, FieldEntry>,
}

impl FieldData {
    /// The first required-but-unfilled field in document order, if any.
    pub fn first_missing_required(&self) -> Option<&CollectedField> {
        self.fields.iter().find(|f| f.is_required && !f.is_filled)
    }

    /// Current values keyed by field id, as consumed by the validator runner.
    pub fn value_map(&self) -> HashMap<String, Value> {
        self.by_id
            .iter()
            .map(|(id, entry)| (id.clone(), entry.value.clone()))
            .collect()
    }
}

/// Whether a collected value counts as filled.
///
/// Null is never filled, sequences must be non-empty, any boolean counts as
/// filled, and text must be non-empty.
pub(crate) fn value_is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Bool(_) => true,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Reads the current value of every control and reconciles it against the
/// schema.
///
/// Radio groups contribute the checked option's value (`Null` when none is
/// checked); checkbox groups contribute the ordered list of checked values.
/// Either kind is evaluated once per group name regardless of how many
/// elements share it. Controls with no matching schema question fall back to
/// the raw control name for label and required status.
pub fn collect(snapshot: &DocumentSnapshot, schema: &FormSchema) -> FieldData {
    let mut data = FieldData::default();
    let mut seen_radio_groups: HashSet<&str> = HashSet::new();
    let mut seen_checkbox_groups: HashSet<&str> = HashSet::new();

    for (index, control) in snapshot.controls.iter().enumerate() {
        let value = match control.kind {
            ControlKind::Radio => {
                if !seen_radio_groups.insert(&control.name) {
                    continue;
                }
                snapshot
                    .controls
                    .iter()
                    .find(|c| c.kind == ControlKind::Radio && c.name == control.name && c.checked)
                    .map(|c| c.value.clone())
                    .unwrap_or(Value::Null)
            }
            ControlKind::Checkbox => {
                if !seen_checkbox_groups.insert(&control.name) {
                    continue;
                }
                let checked: Vec<Value> = snapshot
                    .controls
                    .iter()
                    .filter(|c| {
                        c.kind == ControlKind::Checkbox && c.name == control.name && c.checked
                    })
                    .map(|c| c.value.clone())
                    .collect();
                Value::Array(checked)
            }
            ControlKind::Other => control.value.clone(),
        };

        let matched = schema.find_field(&control.name);
        let is_filled = value_is_filled(&value);
        let is_required = matched
            .map(|field| field.required.is_required())
            .unwrap_or(false)
            || control.label_required_marker;
        let label = control
            .label
            .clone()
            .or_else(|| matched.and_then(|field| field.label.clone()))
            .unwrap_or_else(|| control.name.clone());

        data.by_id.insert(
            control.name.clone(),
            FieldEntry {
                value: value.clone(),
                is_filled,
                is_required,
            },
        );
        data.fields.push(CollectedField {
            field_id: control.name.clone(),
            label,
            value,
            is_filled,
            is_required,
            control_index: index,
        });
    }

    data
}
