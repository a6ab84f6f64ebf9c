//! Reference data managed by the backend: executors and conversation scripts

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::classifier::catalog::id_from_any;

/// Placeholder in script step text replaced with the classification response
pub const CLASSIFICATION_RESPONSE_PLACEHOLDER: &str = "{classification_response}";

/// Reference collections exposed under `/api/references/{kind}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Executors,
    Classifiers,
    Algorithms,
}

impl ReferenceKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ReferenceKind::Executors => "executors",
            ReferenceKind::Classifiers => "classifiers",
            ReferenceKind::Algorithms => "algorithms",
        }
    }
}

/// A service responsible for resolving requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Executor {
    #[serde(default, deserialize_with = "id_from_any")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub work_hours: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Role of a step in a conversation script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Greeting,
    Question,
    Response,
    Farewell,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ScriptStep {
    pub order: u32,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub text: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub next_step: Option<u32>,
    #[serde(default)]
    pub wait_for_input: bool,
    #[serde(default)]
    pub save_to: Option<String>,
}

impl ScriptStep {
    /// Step text with the classification response substituted in
    pub fn render(&self, classification_response: &str) -> String {
        self.text
            .replace(CLASSIFICATION_RESPONSE_PLACEHOLDER, classification_response)
    }
}

/// Conversation script (the backend calls these "algorithms")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ConversationScript {
    #[serde(default, deserialize_with = "id_from_any")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    #[serde(default)]
    pub classifier_ids: Vec<String>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl ConversationScript {
    /// First step of the given kind in script order
    pub fn step(&self, kind: StepKind) -> Option<&ScriptStep> {
        let mut steps: Vec<&ScriptStep> = self.steps.iter().filter(|s| s.kind == kind).collect();
        steps.sort_by_key(|s| s.order);
        steps.into_iter().next()
    }
}

/// `{"data": [...]}` list envelope
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// `{"data": {...}}` single item envelope; some endpoints return the bare item
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            ItemEnvelope::Wrapped { data } => data,
            ItemEnvelope::Bare(item) => item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script_json() -> &'static str {
        r#"{
            "id": "algo-1",
            "name": "Стандартний алгоритм",
            "is_default": true,
            "steps": [
                {"order": 3, "type": "question", "text": "Чи можу я ще чимось допомогти?", "wait_for_input": true},
                {"order": 2, "type": "response", "text": "{classification_response}"},
                {"order": 1, "type": "greeting", "text": "Доброго дня!", "wait_for_input": true, "save_to": "user_query"},
                {"order": 4, "type": "farewell", "text": "Дякую за звернення!"}
            ]
        }"#
    }

    #[test]
    fn test_script_steps_by_kind() {
        let script: ConversationScript = serde_json::from_str(script_json()).unwrap();

        assert!(script.is_active);
        assert_eq!(script.step(StepKind::Greeting).unwrap().text, "Доброго дня!");
        assert_eq!(script.step(StepKind::Farewell).unwrap().order, 4);
        assert!(script.step(StepKind::Transfer).is_none());
    }

    #[test]
    fn test_response_step_renders_placeholder() {
        let script: ConversationScript = serde_json::from_str(script_json()).unwrap();
        let step = script.step(StepKind::Response).unwrap();

        assert_eq!(step.render("Заявку прийнято."), "Заявку прийнято.");
    }

    #[test]
    fn test_item_envelope_accepts_both_shapes() {
        let wrapped: ItemEnvelope<Executor> =
            serde_json::from_str(r#"{"data": {"id": "exec-1", "name": "Аварійна служба"}}"#)
                .unwrap();
        let bare: ItemEnvelope<Executor> =
            serde_json::from_str(r#"{"id": "exec-1", "name": "Аварійна служба"}"#).unwrap();

        assert_eq!(wrapped.into_inner(), bare.into_inner());
    }
}
