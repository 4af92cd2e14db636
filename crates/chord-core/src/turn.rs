use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Human,
    Bot,
}

/// Conversational intent labels. Unknown backend labels are kept verbatim
/// in [`Intent::Other`] and behave like general conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Intent {
    Greeting,
    Farewell,
    IdentityIntroduction,
    EntityIntroduction,
    IdentityQuery,
    EntityQuery,
    Question,
    InformationRequest,
    HelpRequest,
    Gratitude,
    PositiveFeedback,
    NegativeFeedback,
    GeneralConversation,
    Other(String),
}

impl Intent {
    /// Parse a backend label, case-insensitively.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "GREETING" => Intent::Greeting,
            "FAREWELL" => Intent::Farewell,
            "IDENTITY_INTRODUCTION" => Intent::IdentityIntroduction,
            "ENTITY_INTRODUCTION" => Intent::EntityIntroduction,
            "IDENTITY_QUERY" => Intent::IdentityQuery,
            "ENTITY_QUERY" => Intent::EntityQuery,
            "QUESTION" => Intent::Question,
            "INFORMATION_REQUEST" => Intent::InformationRequest,
            "HELP_REQUEST" | "HELP" => Intent::HelpRequest,
            "GRATITUDE" => Intent::Gratitude,
            "POSITIVE_FEEDBACK" => Intent::PositiveFeedback,
            "NEGATIVE_FEEDBACK" => Intent::NegativeFeedback,
            "GENERAL_CONVERSATION" | "" => Intent::GeneralConversation,
            _ => Intent::Other(label.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Intent::Greeting => "GREETING",
            Intent::Farewell => "FAREWELL",
            Intent::IdentityIntroduction => "IDENTITY_INTRODUCTION",
            Intent::EntityIntroduction => "ENTITY_INTRODUCTION",
            Intent::IdentityQuery => "IDENTITY_QUERY",
            Intent::EntityQuery => "ENTITY_QUERY",
            Intent::Question => "QUESTION",
            Intent::InformationRequest => "INFORMATION_REQUEST",
            Intent::HelpRequest => "HELP_REQUEST",
            Intent::Gratitude => "GRATITUDE",
            Intent::PositiveFeedback => "POSITIVE_FEEDBACK",
            Intent::NegativeFeedback => "NEGATIVE_FEEDBACK",
            Intent::GeneralConversation => "GENERAL_CONVERSATION",
            Intent::Other(label) => label,
        }
    }

    pub fn is_introduction(&self) -> bool {
        matches!(self, Intent::IdentityIntroduction | Intent::EntityIntroduction)
    }

    /// Questions and information requests, excluding memory recall queries.
    pub fn is_information_seeking(&self) -> bool {
        matches!(self, Intent::Question | Intent::InformationRequest)
    }

    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Intent::IdentityQuery | Intent::EntityQuery | Intent::Question | Intent::InformationRequest
        )
    }

    pub fn is_general(&self) -> bool {
        matches!(self, Intent::GeneralConversation | Intent::Other(_))
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for Intent {
    fn from(label: String) -> Self {
        Intent::from_label(&label)
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.label().to_string()
    }
}

/// One entity slot of a turn, e.g. `entity_1 = "Buddy"`.
/// A `None` or blank value stands for a missing entity and is never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub key: String,
    pub value: Option<String>,
    pub kind: Option<String>,
}

impl EntityMention {
    pub fn new(key: &str, value: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            value: value.map(str::to_string),
            kind: None,
        }
    }

    pub fn typed(key: &str, value: &str, kind: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
            kind: Some(kind.to_string()),
        }
    }

    /// Trimmed value, if present and non-empty.
    pub fn present_value(&self) -> Option<&str> {
        self.value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Positional mentions `entity_0`, `entity_1`, ... from plain values.
pub fn positional_entities<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<EntityMention> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| EntityMention::new(&format!("entity_{i}"), Some(v)))
        .collect()
}

/// Everything a stage needs to know about an incoming turn.
#[derive(Clone, Debug)]
pub struct TurnInput {
    pub speaker: Speaker,
    pub text: String,
    pub intent: Intent,
    pub intent_confidence: Option<f64>,
    pub entities: Vec<EntityMention>,
    pub context: BTreeMap<String, serde_json::Value>,
    pub timestamp: u64,
}

impl TurnInput {
    pub fn human(text: &str, intent: Intent, entities: Vec<EntityMention>, timestamp: u64) -> Self {
        Self {
            speaker: Speaker::Human,
            text: text.to_string(),
            intent,
            intent_confidence: None,
            entities,
            context: BTreeMap::new(),
            timestamp,
        }
    }

    /// Non-empty entity values in slot order.
    pub fn entity_values(&self) -> Vec<&str> {
        self.entities.iter().filter_map(EntityMention::present_value).collect()
    }
}

/// Immutable record of one turn in history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub timestamp: u64,
    pub speaker: Speaker,
    pub text: String,
    pub intent: Intent,
    pub entities: Vec<EntityMention>,
    pub context: BTreeMap<String, serde_json::Value>,
}

impl ConversationTurn {
    pub fn from_input(input: &TurnInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: input.timestamp,
            speaker: input.speaker,
            text: input.text.clone(),
            intent: input.intent.clone(),
            entities: input.entities.clone(),
            context: input.context.clone(),
        }
    }

    pub fn entity_values(&self) -> Vec<&str> {
        self.entities.iter().filter_map(EntityMention::present_value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_label_roundtrip() {
        for label in ["GREETING", "ENTITY_QUERY", "HELP_REQUEST", "GENERAL_CONVERSATION"] {
            assert_eq!(Intent::from_label(label).label(), label);
        }
        assert_eq!(Intent::from_label("greeting"), Intent::Greeting);
    }

    #[test]
    fn test_unknown_label_is_general() {
        let i = Intent::from_label("SMALL_TALK");
        assert_eq!(i, Intent::Other("SMALL_TALK".to_string()));
        assert!(i.is_general());
        assert_eq!(i.label(), "SMALL_TALK");
    }

    #[test]
    fn test_intent_serializes_as_label() {
        let json = serde_json::to_string(&Intent::EntityIntroduction).unwrap();
        assert_eq!(json, "\"ENTITY_INTRODUCTION\"");
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Intent::EntityIntroduction);
    }

    #[test]
    fn test_present_value_filters_blank() {
        assert_eq!(EntityMention::new("e0", None).present_value(), None);
        assert_eq!(EntityMention::new("e1", Some("   ")).present_value(), None);
        assert_eq!(EntityMention::new("e2", Some(" Rex ")).present_value(), Some("Rex"));
    }

    #[test]
    fn test_positional_entities() {
        let e = positional_entities(["dog", "Buddy"]);
        assert_eq!(e[0].key, "entity_0");
        assert_eq!(e[1].present_value(), Some("Buddy"));
    }
}
