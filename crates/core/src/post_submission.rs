//! Post-submission side effects.
//!
//! After a successful submission the coordinator hands the aggregated
//! results to this runner. Every configured action executes independently
//! and concurrently; a failing action surfaces a secondary notification and
//! never disturbs its siblings or the already-successful submission.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use forms_types::{Notification, PatientRef, SessionMode};
use futures::future::join_all;
use serde_json::Value;

use crate::error::{FormError, FormResult};
use crate::expression;
use crate::notification::NotificationSink;
use crate::schema::PostSubmissionActionConfig;
use crate::session::SessionSnapshot;
use crate::submission::SubmissionResult;

/// Context handed to a post-submission action.
pub struct PostActionContext<'a> {
    pub patient: &'a PatientRef,
    pub session_mode: SessionMode,
    /// Flattened encounter data from every submission result, in result
    /// order.
    pub encounters: &'a [Value],
}

/// A side effect run after a successful submission, such as creating a
/// follow-up appointment or a program enrolment.
#[async_trait]
pub trait PostSubmissionAction: Send + Sync {
    async fn apply_action(&self, ctx: PostActionContext<'_>, config: &Value) -> anyhow::Result<()>;
}

/// One configured action: the resolved implementation plus its
/// schema-declared settings.
#[derive(Clone)]
pub struct PostSubmissionActionMeta {
    pub action_id: String,
    pub action: Arc<dyn PostSubmissionAction>,
    pub config: Value,
    /// Enablement expression; absent means always enabled.
    pub enabled: Option<String>,
}

impl std::fmt::Debug for PostSubmissionActionMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostSubmissionActionMeta")
            .field("action_id", &self.action_id)
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Resolves schema-declared action configs against the registered
/// implementations. An unresolvable action id is a configuration error.
pub fn resolve_actions(
    configs: &[PostSubmissionActionConfig],
    implementations: &HashMap<String, Arc<dyn PostSubmissionAction>>,
) -> FormResult<Vec<PostSubmissionActionMeta>> {
    configs
        .iter()
        .map(|config| {
            let action = implementations
                .get(&config.action_id)
                .cloned()
                .ok_or_else(|| {
                    FormError::InvalidInput(format!(
                        "no implementation registered for post-submission action `{}`",
                        config.action_id
                    ))
                })?;
            Ok(PostSubmissionActionMeta {
                action_id: config.action_id.clone(),
                action,
                config: config.config.clone(),
                enabled: config.enabled.clone(),
            })
        })
        .collect()
}

/// Structured failure carrying a backend response body, so notifications can
/// show the server's own messages.
#[derive(Debug, thiserror::Error)]
#[error("request failed")]
pub struct ResponseError {
    pub body: Value,
}

/// Runs every configured action concurrently. Never fails: each action's
/// errors are reported through the sink and contained to that action.
pub async fn run(
    handlers: &[PostSubmissionActionMeta],
    results: &[SubmissionResult],
    session: &SessionSnapshot,
    sink: &dyn NotificationSink,
) {
    join_all(
        handlers
            .iter()
            .map(|meta| run_one(meta, results, session, sink)),
    )
    .await;
}

async fn run_one(
    meta: &PostSubmissionActionMeta,
    results: &[SubmissionResult],
    session: &SessionSnapshot,
    sink: &dyn NotificationSink,
) {
    let outcome: anyhow::Result<()> = async {
        let encounters = flatten_encounter_data(results);
        if encounters.is_empty() {
            bail!("no encounter data to process post submission action");
        }

        let enabled = match &meta.enabled {
            Some(expr) => expression::evaluate(expr, &encounters)?,
            None => true,
        };
        if !enabled {
            return Ok(());
        }

        meta.action
            .apply_action(
                PostActionContext {
                    patient: &session.patient,
                    session_mode: session.mode,
                    encounters: &encounters,
                },
                &meta.config,
            )
            .await
    }
    .await;

    if let Err(error) = outcome {
        let messages = extract_error_messages(&error);
        tracing::warn!(action = %meta.action_id, "post-submission action failed");

        let title = if meta.action_id.is_empty() {
            "Post Submission Error".to_owned()
        } else {
            humanize_action_id(&meta.action_id)
        };
        sink.show(Notification::error(title, messages.join(", ")));
    }
}

/// Builds the flat encounter list an action receives: for every result, its
/// nested `data` payload if present, then the result itself if it carries a
/// record identifier. Both can apply to one result.
fn flatten_encounter_data(results: &[SubmissionResult]) -> Vec<Value> {
    let mut encounters = Vec::new();
    for result in results {
        if let Some(data) = result.data() {
            encounters.push(data.clone());
        }
        if result.uuid().is_some() {
            encounters.push(result.0.clone());
        }
    }
    encounters
}

/// Extracts the human-readable messages carried by an action failure.
///
/// Structured response bodies contribute their global error messages (or
/// the top-level error message); anything else falls back to the error's
/// display string.
fn extract_error_messages(error: &anyhow::Error) -> Vec<String> {
    if let Some(response) = error.downcast_ref::<ResponseError>() {
        if let Some(globals) = response
            .body
            .pointer("/error/globalErrors")
            .and_then(Value::as_array)
        {
            let messages: Vec<String> = globals
                .iter()
                .filter_map(|entry| entry.get("message").and_then(Value::as_str))
                .map(str::to_owned)
                .collect();
            if !messages.is_empty() {
                return messages;
            }
        }
        if let Some(message) = response
            .body
            .pointer("/error/message")
            .and_then(Value::as_str)
        {
            return vec![message.to_owned()];
        }
    }
    vec![error.to_string()]
}

/// Expands a camelCase action id into spaced words for display.
fn humanize_action_id(action_id: &str) -> String {
    let mut out = String::with_capacity(action_id.len() + 4);
    let mut prev_lowercase = false;
    for ch in action_id.chars() {
        if prev_lowercase && ch.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(ch);
        prev_lowercase = ch.is_ascii_lowercase();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use forms_types::NotificationKind;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        shown: Mutex<Vec<Notification>>,
    }

    impl NotificationSink for RecordingSink {
        fn show(&self, notification: Notification) {
            self.shown.lock().expect("sink lock").push(notification);
        }
    }

    #[derive(Default)]
    struct RecordingAction {
        encounters: Mutex<Vec<Vec<Value>>>,
    }

    #[async_trait]
    impl PostSubmissionAction for RecordingAction {
        async fn apply_action(
            &self,
            ctx: PostActionContext<'_>,
            _config: &Value,
        ) -> anyhow::Result<()> {
            self.encounters
                .lock()
                .expect("encounters lock")
                .push(ctx.encounters.to_vec());
            Ok(())
        }
    }

    struct FailingAction;

    #[async_trait]
    impl PostSubmissionAction for FailingAction {
        async fn apply_action(
            &self,
            _ctx: PostActionContext<'_>,
            _config: &Value,
        ) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    fn meta(action_id: &str, action: Arc<dyn PostSubmissionAction>) -> PostSubmissionActionMeta {
        PostSubmissionActionMeta {
            action_id: action_id.to_owned(),
            action,
            config: Value::Null,
            enabled: None,
        }
    }

    fn session() -> SessionSnapshot {
        SessionSnapshot::new(PatientRef::new("patient-1"), SessionMode::Enter)
    }

    fn results() -> Vec<SubmissionResult> {
        vec![
            SubmissionResult(json!({ "uuid": "e1" })),
            SubmissionResult(json!({ "data": { "uuid": "e2" } })),
        ]
    }

    #[tokio::test]
    async fn handler_without_enabled_expression_always_runs() {
        let action = Arc::new(RecordingAction::default());
        let sink = RecordingSink::default();

        run(&[meta("followUp", action.clone())], &results(), &session(), &sink).await;

        let seen = action.encounters.lock().expect("encounters lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            vec![json!({ "uuid": "e1" }), json!({ "uuid": "e2" })]
        );
        assert!(sink.shown.lock().expect("sink lock").is_empty());
    }

    #[tokio::test]
    async fn failing_handler_does_not_disturb_siblings() {
        let surviving = Arc::new(RecordingAction::default());
        let sink = RecordingSink::default();

        run(
            &[
                meta("sendToRegistry", Arc::new(FailingAction)),
                meta("followUp", surviving.clone()),
            ],
            &results(),
            &session(),
            &sink,
        )
        .await;

        assert_eq!(surviving.encounters.lock().expect("encounters lock").len(), 1);

        let shown = sink.shown.lock().expect("sink lock");
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].kind, NotificationKind::Error);
        assert_eq!(shown[0].title, "send To Registry");
        assert!(shown[0].subtitle.as_deref().expect("subtitle").contains("boom"));
    }

    #[tokio::test]
    async fn empty_encounter_data_is_a_per_handler_error() {
        let action = Arc::new(RecordingAction::default());
        let sink = RecordingSink::default();

        run(
            &[meta("followUp", action.clone())],
            &[SubmissionResult(json!({ "status": "ok" }))],
            &session(),
            &sink,
        )
        .await;

        assert!(action.encounters.lock().expect("encounters lock").is_empty());
        let shown = sink.shown.lock().expect("sink lock");
        assert_eq!(shown.len(), 1);
        assert!(shown[0]
            .subtitle
            .as_deref()
            .expect("subtitle")
            .contains("no encounter data"));
    }

    #[tokio::test]
    async fn disabled_handler_is_skipped_silently() {
        let action = Arc::new(RecordingAction::default());
        let sink = RecordingSink::default();
        let mut disabled = meta("followUp", action.clone());
        disabled.enabled = Some("uuid == 'other'".to_owned());

        run(&[disabled], &results(), &session(), &sink).await;

        assert!(action.encounters.lock().expect("encounters lock").is_empty());
        assert!(sink.shown.lock().expect("sink lock").is_empty());
    }

    #[tokio::test]
    async fn broken_enabled_expression_is_reported() {
        let action = Arc::new(RecordingAction::default());
        let sink = RecordingSink::default();
        let mut broken = meta("followUp", action.clone());
        broken.enabled = Some("uuid >> 'e1'".to_owned());

        run(&[broken], &results(), &session(), &sink).await;

        assert!(action.encounters.lock().expect("encounters lock").is_empty());
        assert_eq!(sink.shown.lock().expect("sink lock").len(), 1);
    }

    #[test]
    fn flatten_appends_data_and_identified_results_in_order() {
        let flattened = flatten_encounter_data(&[
            SubmissionResult(json!({ "uuid": "e1" })),
            SubmissionResult(json!({ "uuid": "e3", "data": { "uuid": "e2" } })),
        ]);
        assert_eq!(
            flattened,
            vec![
                json!({ "uuid": "e1" }),
                json!({ "uuid": "e2" }),
                json!({ "uuid": "e3", "data": { "uuid": "e2" } }),
            ]
        );
    }

    #[test]
    fn humanize_expands_camel_case_ids() {
        assert_eq!(humanize_action_id("sendToRegistry"), "send To Registry");
        assert_eq!(humanize_action_id("followup"), "followup");
        assert_eq!(humanize_action_id(""), "");
    }

    #[test]
    fn response_errors_contribute_global_messages() {
        let error = anyhow::Error::new(ResponseError {
            body: json!({
                "error": {
                    "message": "Invalid submission",
                    "globalErrors": [
                        { "message": "Visit is closed" },
                        { "message": "Encounter date is in the future" }
                    ]
                }
            }),
        });

        assert_eq!(
            extract_error_messages(&error),
            vec![
                "Visit is closed".to_owned(),
                "Encounter date is in the future".to_owned(),
            ]
        );
    }

    #[test]
    fn plain_errors_fall_back_to_display_string() {
        let error = anyhow::anyhow!("boom");
        assert_eq!(extract_error_messages(&error), vec!["boom".to_owned()]);
    }

    #[test]
    fn resolve_actions_rejects_unknown_action_ids() {
        let configs = vec![PostSubmissionActionConfig {
            action_id: "sendToRegistry".to_owned(),
            config: Value::Null,
            enabled: None,
        }];

        let err = resolve_actions(&configs, &HashMap::new()).expect_err("expected failure");
        assert!(matches!(err, FormError::InvalidInput(_)));
    }

    #[test]
    fn resolve_actions_carries_config_and_enablement() {
        let mut implementations: HashMap<String, Arc<dyn PostSubmissionAction>> = HashMap::new();
        implementations.insert("followUp".to_owned(), Arc::new(RecordingAction::default()));

        let configs = vec![PostSubmissionActionConfig {
            action_id: "followUp".to_owned(),
            config: json!({ "programUuid": "p1" }),
            enabled: Some("!isEmpty(uuid)".to_owned()),
        }];

        let resolved = resolve_actions(&configs, &implementations).expect("resolves");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].config, json!({ "programUuid": "p1" }));
        assert_eq!(resolved[0].enabled.as_deref(), Some("!isEmpty(uuid)"));
    }
}
