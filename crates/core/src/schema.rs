//! Form schema types.
//!
//! The schema arrives as backend JSON and is immutable once parsed. Mutable
//! per-submission state (errors, warnings, unspecified flags) lives in the
//! field store, never here.

use forms_types::NonEmptyText;
use serde::Deserialize;
use serde_json::Value;

/// A required flag as it appears in schema JSON: a boolean, or the string
/// `"true"` in older schemas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequiredFlag(bool);

impl RequiredFlag {
    pub fn new(required: bool) -> Self {
        Self(required)
    }

    pub fn is_required(self) -> bool {
        self.0
    }
}

impl<'de> Deserialize<'de> for RequiredFlag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Text(String),
        }

        let flag = match Repr::deserialize(deserializer)? {
            Repr::Bool(b) => b,
            Repr::Text(s) => s == "true",
        };
        Ok(RequiredFlag(flag))
    }
}

/// One validator to run against a field, in declared order.
///
/// `kind` names the implementation in the validator registry; everything
/// else in the JSON object is carried verbatim as validator parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct ValidatorConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, Value>,
}

impl ValidatorConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: serde_json::Map::new(),
        }
    }
}

/// A single question in the form schema.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: RequiredFlag,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_parent_hidden: bool,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub validators: Vec<ValidatorConfig>,
}

impl FormField {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            required: RequiredFlag::default(),
            is_hidden: false,
            is_parent_hidden: false,
            is_disabled: false,
            readonly: false,
            validators: Vec::new(),
        }
    }
}

/// A titled group of questions within a page.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormSection {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub questions: Vec<FormField>,
}

/// One page of the rendered form.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormPage {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sections: Vec<FormSection>,
}

/// What the UI shell should do after a successful submission.
///
/// Declared per schema rather than keyed off a specific form identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "behavior", rename_all = "kebab-case")]
pub enum OnSuccessBehavior {
    /// Show the standard success notification only.
    #[default]
    Notify,
    /// Navigate to `url` once the success notification is shown.
    Redirect { url: String },
    /// Show an acknowledgement popup, then optionally navigate away.
    #[serde(rename_all = "camelCase")]
    CustomPopup {
        heading: String,
        body: String,
        acknowledge_label: String,
        #[serde(default)]
        redirect: Option<String>,
    },
}

/// Schema-declared configuration for one post-submission action.
///
/// The implementation it names is resolved when the coordinator is wired up.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSubmissionActionConfig {
    pub action_id: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub enabled: Option<String>,
}

/// The resolved schema for one form.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub name: NonEmptyText,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub pages: Vec<FormPage>,
    #[serde(default)]
    pub post_submission_actions: Vec<PostSubmissionActionConfig>,
    #[serde(default)]
    pub on_success: OnSuccessBehavior,
}

impl FormSchema {
    /// All questions in declared order, flattened across pages and sections.
    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.pages
            .iter()
            .flat_map(|page| page.sections.iter())
            .flat_map(|section| section.questions.iter())
    }

    /// Finds the question matching a rendered control's name.
    pub fn find_field(&self, id: &str) -> Option<&FormField> {
        self.fields().find(|field| field.id == id)
    }
}
