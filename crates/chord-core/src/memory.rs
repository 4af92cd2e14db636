//! Pragmatic memory: rolling history, entity records, intent activation,
//! topic and goals.
//!
//! `MemoryState` is an immutable snapshot. [`MemoryState::advance`] takes
//! one turn and returns the next snapshot; the previous one is untouched,
//! so a caller can discard the result if a later pipeline step fails.

use std::collections::{BTreeMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;
use crate::constants::{FEMALE_RELATIONS, MALE_RELATIONS, NAME_PRONOUNS, RELATION_NOUNS};
use crate::time::within_window;
use crate::tokenizer::{extract_keywords, starts_uppercase};
use crate::turn::{ConversationTurn, Intent, Speaker, TurnInput};

static FAVORITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy favou?rite (\w+) is ([^.,!?;]+)").unwrap()
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityMemoryRecord {
    pub value: String,
    pub entity_type: Option<String>,
    pub relationship: Option<String>,
    pub last_mentioned: u64,
    pub mention_count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentState {
    pub intent: Intent,
    pub confidence: f64,
    pub parameters: BTreeMap<String, String>,
    pub active: bool,
    pub turns_since_activation: u32,
}

/// What response generation sees of memory.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResponseContext {
    pub recent_history: Vec<ConversationTurn>,
    pub current_topic: Option<String>,
    pub active_intents: Vec<Intent>,
    pub goals: Vec<String>,
    pub relevant_entities: BTreeMap<String, EntityMemoryRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub turns: usize,
    pub entities: usize,
    pub active_intents: usize,
    pub tracked_intents: usize,
    pub goals: usize,
    pub current_topic: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MemoryState {
    config: MemoryConfig,
    history: VecDeque<ConversationTurn>,
    entities: BTreeMap<String, EntityMemoryRecord>,
    intents: Vec<IntentState>,
    current_topic: Option<String>,
    goals: Vec<String>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Relationship heuristics
// ---------------------------------------------------------------------------

/// An entity record derived from the shape of a turn rather than its slots.
#[derive(Debug, PartialEq)]
struct Derived {
    key: String,
    value: String,
    entity_type: Option<String>,
    relationship: Option<String>,
}

struct RuleInput<'a> {
    /// Lowercased text of the turn.
    lower: &'a str,
    text: &'a str,
    values: &'a [&'a str],
    intent: &'a Intent,
    /// Turns before the current one, oldest first.
    earlier: &'a [&'a ConversationTurn],
}

struct RelationshipRule {
    name: &'static str,
    apply: fn(&RuleInput) -> Option<Derived>,
}

/// Evaluated in order; the first rule that derives a record wins.
const RELATIONSHIP_RULES: &[RelationshipRule] = &[
    RelationshipRule {
        name: "self_name",
        apply: self_name_rule,
    },
    RelationshipRule {
        name: "possessive_name",
        apply: possessive_name_rule,
    },
    RelationshipRule {
        name: "pronoun_name",
        apply: pronoun_name_rule,
    },
    RelationshipRule {
        name: "favorite",
        apply: favorite_rule,
    },
    RelationshipRule {
        name: "introduced_pair",
        apply: introduced_pair_rule,
    },
];

fn self_name_rule(input: &RuleInput) -> Option<Derived> {
    if input.values.len() != 2 || !input.lower.contains("my name is") {
        return None;
    }
    let name = input.values[1];
    starts_uppercase(name).then(|| Derived {
        key: "user_name".into(),
        value: name.to_string(),
        entity_type: Some("person".into()),
        relationship: Some("self".into()),
    })
}

fn possessive_name_rule(input: &RuleInput) -> Option<Derived> {
    if input.values.len() != 2 || !input.lower.contains("'s name is") {
        return None;
    }
    let relation = RELATION_NOUNS.iter().find(|r| input.lower.contains(*r))?;
    Some(Derived {
        key: format!("{relation}_name"),
        value: input.values[1].to_string(),
        entity_type: Some("name".into()),
        relationship: Some(relation.to_string()),
    })
}

/// Relation nouns asked about in recent ENTITY_QUERY turns, newest first.
fn recent_query_relations(earlier: &[&ConversationTurn]) -> Vec<String> {
    earlier
        .iter()
        .rev()
        .filter(|t| t.intent == Intent::EntityQuery)
        .flat_map(|t| t.entity_values())
        .map(str::to_lowercase)
        .filter(|v| v != "name" && !NAME_PRONOUNS.contains(&v.as_str()))
        .collect()
}

/// Resolve a pronoun against candidate relations: gendered lists first,
/// then the first candidate.
pub(crate) fn resolve_pronoun(pronoun: &str, candidates: &[String]) -> Option<String> {
    let gendered: &[&str] = match pronoun {
        "her" => FEMALE_RELATIONS,
        "his" => MALE_RELATIONS,
        _ => &[],
    };
    candidates
        .iter()
        .find(|c| gendered.contains(&c.as_str()))
        .or_else(|| candidates.first())
        .cloned()
}

fn pronoun_name_rule(input: &RuleInput) -> Option<Derived> {
    let [pronoun, attribute, value] = input.values else {
        return None;
    };
    let pronoun = pronoun.to_lowercase();
    if !NAME_PRONOUNS.contains(&pronoun.as_str()) || !attribute.eq_ignore_ascii_case("name") {
        return None;
    }
    let relation = resolve_pronoun(&pronoun, &recent_query_relations(input.earlier))?;
    Some(Derived {
        key: format!("{relation}_name"),
        value: value.to_string(),
        entity_type: Some("name".into()),
        relationship: Some(relation),
    })
}

fn favorite_rule(input: &RuleInput) -> Option<Derived> {
    let caps = FAVORITE.captures(input.text)?;
    let category = caps[1].to_lowercase();
    let value = caps[2].trim();
    (!value.is_empty()).then(|| Derived {
        key: format!("favorite_{category}"),
        value: value.to_string(),
        entity_type: Some(category.clone()),
        relationship: Some("favorite".into()),
    })
}

fn introduced_pair_rule(input: &RuleInput) -> Option<Derived> {
    if *input.intent != Intent::EntityIntroduction || input.values.len() != 2 {
        return None;
    }
    let subject = input.values[0].to_lowercase();
    if subject.is_empty() || !subject.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    // Only a proper name, or an explicit "name", makes the value a name
    if !starts_uppercase(input.values[1]) && !input.lower.contains("name") {
        return None;
    }
    Some(Derived {
        key: format!("{subject}_name"),
        value: input.values[1].to_string(),
        entity_type: Some("name".into()),
        relationship: Some(subject),
    })
}

// ---------------------------------------------------------------------------
// Fixed intent tables
// ---------------------------------------------------------------------------

fn topic_for_intent(intent: &Intent) -> Option<&'static str> {
    match intent {
        Intent::Greeting => Some("greeting"),
        Intent::Farewell => Some("farewell"),
        Intent::IdentityIntroduction | Intent::IdentityQuery => Some("personal_identity"),
        Intent::EntityIntroduction | Intent::EntityQuery => Some("personal_entities"),
        Intent::HelpRequest => Some("assistance"),
        Intent::Gratitude => Some("appreciation"),
        Intent::PositiveFeedback | Intent::NegativeFeedback => Some("feedback"),
        _ => None,
    }
}

fn goal_for_intent(intent: &Intent) -> Option<&'static str> {
    match intent {
        Intent::IdentityIntroduction => Some("establish_identity"),
        Intent::EntityIntroduction => Some("share_information"),
        Intent::IdentityQuery | Intent::EntityQuery => Some("recall_information"),
        Intent::Question | Intent::InformationRequest => Some("seek_information"),
        Intent::HelpRequest => Some("get_assistance"),
        Intent::Greeting => Some("build_rapport"),
        Intent::Gratitude | Intent::PositiveFeedback => Some("express_appreciation"),
        Intent::Farewell => Some("end_conversation"),
        _ => None,
    }
}

impl MemoryState {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            history: VecDeque::new(),
            entities: BTreeMap::new(),
            intents: Vec::new(),
            current_topic: None,
            goals: Vec::new(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Process one turn and return the next snapshot.
    pub fn advance(&self, input: &TurnInput) -> Self {
        let mut next = self.clone();
        next.push_turn(ConversationTurn::from_input(input));
        next.store_entities(input);
        next.apply_relationship_rules(input);
        next.update_intents(input);
        next.update_topic(input);
        next.update_goals(&input.intent);
        next
    }

    /// Append a bot reply to history without touching intents, topic or goals.
    pub fn with_bot_turn(&self, text: &str, intent: Intent, timestamp: u64) -> Self {
        let mut next = self.clone();
        next.push_turn(ConversationTurn::from_input(&TurnInput {
            speaker: Speaker::Bot,
            intent,
            ..TurnInput::human(text, Intent::GeneralConversation, Vec::new(), timestamp)
        }));
        next
    }

    fn push_turn(&mut self, turn: ConversationTurn) {
        self.history.push_back(turn);
        while self.history.len() > self.config.history_cap {
            self.history.pop_front();
        }
    }

    fn upsert_entity(
        &mut self,
        key: &str,
        value: &str,
        entity_type: Option<String>,
        relationship: Option<String>,
        now: u64,
    ) {
        match self.entities.get_mut(key) {
            Some(record) => {
                record.value = value.to_string();
                record.last_mentioned = now;
                record.mention_count += 1;
                if entity_type.is_some() {
                    record.entity_type = entity_type;
                }
                if relationship.is_some() {
                    record.relationship = relationship;
                }
            }
            None => {
                self.entities.insert(
                    key.to_string(),
                    EntityMemoryRecord {
                        value: value.to_string(),
                        entity_type,
                        relationship,
                        last_mentioned: now,
                        mention_count: 1,
                    },
                );
            }
        }
    }

    fn store_entities(&mut self, input: &TurnInput) {
        for mention in &input.entities {
            if let Some(value) = mention.present_value() {
                self.upsert_entity(
                    &mention.key,
                    value,
                    mention.kind.clone(),
                    None,
                    input.timestamp,
                );
            }
        }
    }

    fn apply_relationship_rules(&mut self, input: &TurnInput) {
        let values = input.entity_values();
        let lower = input.text.to_lowercase();
        // The current turn is already the last history entry
        let earlier: Vec<&ConversationTurn> = self
            .history
            .iter()
            .rev()
            .skip(1)
            .take(self.config.pronoun_lookback)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let rule_input = RuleInput {
            lower: &lower,
            text: &input.text,
            values: &values,
            intent: &input.intent,
            earlier: &earlier,
        };

        let derived = RELATIONSHIP_RULES
            .iter()
            .find_map(|rule| (rule.apply)(&rule_input).map(|d| (rule.name, d)));

        if let Some((rule, d)) = derived {
            tracing::debug!(rule, key = %d.key, "derived entity");
            self.upsert_entity(&d.key, &d.value, d.entity_type, d.relationship, input.timestamp);
        }
    }

    fn update_intents(&mut self, input: &TurnInput) {
        let cfg = &self.config;
        let parameters: BTreeMap<String, String> = input
            .entities
            .iter()
            .filter_map(|m| m.present_value().map(|v| (m.key.clone(), v.to_string())))
            .collect();

        let mut seen = false;
        for state in &mut self.intents {
            if state.intent == input.intent {
                seen = true;
                state.confidence = (state.confidence + cfg.intent_boost).min(1.0);
                state.turns_since_activation = 0;
                state.active = true;
                state.parameters.extend(parameters.clone());
            } else {
                state.confidence = (state.confidence - cfg.intent_decay).max(0.0);
                state.turns_since_activation += 1;
                if state.confidence < cfg.intent_min_confidence
                    || state.turns_since_activation > cfg.intent_max_idle_turns
                {
                    state.active = false;
                }
            }
        }

        if !seen {
            self.intents.push(IntentState {
                intent: input.intent.clone(),
                confidence: input
                    .intent_confidence
                    .unwrap_or(cfg.initial_intent_confidence)
                    .clamp(0.0, 1.0),
                parameters,
                active: true,
                turns_since_activation: 0,
            });
        }
    }

    fn update_topic(&mut self, input: &TurnInput) {
        if let Some(topic) = topic_for_intent(&input.intent) {
            self.current_topic = Some(topic.to_string());
        } else if input.intent.is_information_seeking() {
            let keywords = extract_keywords(&input.text, 3);
            self.current_topic = Some(
                keywords
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "general_inquiry".to_string()),
            );
        }
    }

    fn update_goals(&mut self, intent: &Intent) {
        let Some(goal) = goal_for_intent(intent) else {
            return;
        };
        self.goals.retain(|g| g != goal);
        self.goals.push(goal.to_string());
        let excess = self.goals.len().saturating_sub(self.config.goal_cap);
        self.goals.drain(..excess);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn query_entity_memory(&self, key: &str) -> Option<&EntityMemoryRecord> {
        self.entities.get(key)
    }

    /// Look up `{entity_type}_{relation}`, e.g. ("dog", "name") → `dog_name`.
    pub fn query_entity_relationship(
        &self,
        entity_type: &str,
        relation: &str,
    ) -> Option<&EntityMemoryRecord> {
        self.entities
            .get(&format!("{}_{}", entity_type.to_lowercase(), relation.to_lowercase()))
    }

    pub fn entities(&self) -> &BTreeMap<String, EntityMemoryRecord> {
        &self.entities
    }

    pub fn history(&self) -> impl DoubleEndedIterator<Item = &ConversationTurn> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The `n` most recent turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn last_turn(&self) -> Option<&ConversationTurn> {
        self.history.back()
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.current_topic.as_deref()
    }

    pub fn intent_state(&self, intent: &Intent) -> Option<&IntentState> {
        self.intents.iter().find(|s| &s.intent == intent)
    }

    pub fn active_intents(&self) -> Vec<Intent> {
        self.intents
            .iter()
            .filter(|s| s.active)
            .map(|s| s.intent.clone())
            .collect()
    }

    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    pub fn context_for_response(&self, now: u64) -> ResponseContext {
        let topic = self.current_topic.as_deref();
        let relevant_entities = self
            .entities
            .iter()
            .filter(|(_, r)| {
                within_window(r.last_mentioned, now, self.config.entity_window_secs)
                    || topic.is_some_and(|t| {
                        r.entity_type.as_deref() == Some(t) || r.relationship.as_deref() == Some(t)
                    })
            })
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();

        ResponseContext {
            recent_history: self.recent(self.config.recent_window),
            current_topic: self.current_topic.clone(),
            active_intents: self.active_intents(),
            goals: self.goals.clone(),
            relevant_entities,
        }
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            turns: self.history.len(),
            entities: self.entities.len(),
            active_intents: self.intents.iter().filter(|s| s.active).count(),
            tracked_intents: self.intents.len(),
            goals: self.goals.len(),
            current_topic: self.current_topic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::{EntityMention, positional_entities};

    fn turn(text: &str, intent: Intent, values: &[&str]) -> TurnInput {
        TurnInput::human(text, intent, positional_entities(values.iter().copied()), 1_000)
    }

    fn run(turns: &[TurnInput]) -> MemoryState {
        turns
            .iter()
            .fold(MemoryState::default(), |state, t| state.advance(t))
    }

    #[test]
    fn test_history_cap_evicts_oldest() {
        let cfg = MemoryConfig {
            history_cap: 3,
            ..MemoryConfig::default()
        };
        let mut state = MemoryState::new(cfg);
        for i in 0..5 {
            state = state.advance(&turn(&format!("Message {i}"), Intent::GeneralConversation, &[]));
        }
        let texts: Vec<&str> = state.history().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Message 2", "Message 3", "Message 4"]);
    }

    #[test]
    fn test_advance_leaves_previous_snapshot_untouched() {
        let before = MemoryState::default();
        let after = before.advance(&turn("hi", Intent::Greeting, &[]));
        assert_eq!(before.history_len(), 0);
        assert_eq!(after.history_len(), 1);
    }

    #[test]
    fn test_entity_roundtrip_dog_name() {
        let state = run(&[turn("", Intent::EntityIntroduction, &["dog", "Buddy"])]);
        assert_eq!(state.query_entity_memory("dog_name").unwrap().value, "Buddy");
        assert_eq!(
            state.query_entity_relationship("dog", "name").unwrap().value,
            "Buddy"
        );
    }

    #[test]
    fn test_introduced_pair_needs_a_name() {
        let state = run(&[
            turn("My dog is a labrador", Intent::EntityIntroduction, &["dog", "labrador"]),
            turn("My cat is a", Intent::EntityIntroduction, &["cat", "a"]),
        ]);
        assert!(state.query_entity_memory("dog_name").is_none());
        assert!(state.query_entity_memory("cat_name").is_none());

        let state = state.advance(&turn("My dog is Rex", Intent::EntityIntroduction, &["dog", "Rex"]));
        assert_eq!(state.query_entity_memory("dog_name").unwrap().value, "Rex");

        let state = state.advance(&turn(
            "my bird's called kiwi, that's the name",
            Intent::EntityIntroduction,
            &["bird", "kiwi"],
        ));
        assert_eq!(state.query_entity_memory("bird_name").unwrap().value, "kiwi");
    }

    #[test]
    fn test_possessive_name_from_text() {
        let state = run(&[turn(
            "My sister's name is Clara",
            Intent::EntityIntroduction,
            &["sister", "Clara"],
        )]);
        let rec = state.query_entity_memory("sister_name").unwrap();
        assert_eq!(rec.value, "Clara");
        assert_eq!(rec.relationship.as_deref(), Some("sister"));
    }

    #[test]
    fn test_null_entities_not_stored() {
        let input = TurnInput::human(
            "nothing here",
            Intent::GeneralConversation,
            vec![
                EntityMention::new("e0", None),
                EntityMention::new("e1", None),
                EntityMention::new("e2", Some("")),
            ],
            1_000,
        );
        let state = MemoryState::default().advance(&input);
        assert!(state.entities().is_empty());
    }

    #[test]
    fn test_repeat_mention_updates_record() {
        let mut a = turn("", Intent::GeneralConversation, &["Rex"]);
        let state = MemoryState::default().advance(&a);
        a.timestamp = 2_000;
        let state = state.advance(&a);
        let rec = state.query_entity_memory("entity_0").unwrap();
        assert_eq!(rec.mention_count, 2);
        assert_eq!(rec.last_mentioned, 2_000);
    }

    #[test]
    fn test_user_name_requires_uppercase() {
        let state = run(&[turn("My name is Alice", Intent::IdentityIntroduction, &["name", "Alice"])]);
        assert_eq!(state.query_entity_memory("user_name").unwrap().value, "Alice");

        let state = run(&[turn("my name is alice", Intent::IdentityIntroduction, &["name", "alice"])]);
        assert!(state.query_entity_memory("user_name").is_none());
    }

    #[test]
    fn test_pronoun_resolution_uses_recent_query() {
        let state = run(&[
            turn("What is my wife's name?", Intent::EntityQuery, &["wife", "name"]),
            turn("I don't know yet.", Intent::GeneralConversation, &[]),
            turn("Her name is Sarah", Intent::EntityIntroduction, &["her", "name", "Sarah"]),
        ]);
        assert_eq!(state.query_entity_memory("wife_name").unwrap().value, "Sarah");
    }

    #[test]
    fn test_pronoun_prefers_gendered_relation() {
        let state = run(&[
            turn("What about my dog and my father?", Intent::EntityQuery, &["dog", "father"]),
            turn("His name is Tom", Intent::EntityIntroduction, &["his", "name", "Tom"]),
        ]);
        assert_eq!(state.query_entity_memory("father_name").unwrap().value, "Tom");
        assert!(state.query_entity_memory("dog_name").is_none());
    }

    #[test]
    fn test_pronoun_without_antecedent_stores_nothing_derived() {
        let state = run(&[turn("Her name is Sarah", Intent::EntityIntroduction, &["her", "name", "Sarah"])]);
        assert!(state.entities().keys().all(|k| !k.ends_with("_name")));
    }

    #[test]
    fn test_pronoun_lookback_is_bounded() {
        let state = run(&[
            turn("What is my wife's name?", Intent::EntityQuery, &["wife", "name"]),
            turn("a", Intent::GeneralConversation, &[]),
            turn("b", Intent::GeneralConversation, &[]),
            turn("c", Intent::GeneralConversation, &[]),
            turn("Her name is Sarah", Intent::EntityIntroduction, &["her", "name", "Sarah"]),
        ]);
        assert!(state.query_entity_memory("wife_name").is_none());
    }

    #[test]
    fn test_favorite_statement() {
        let state = run(&[turn(
            "My favorite color is dark blue.",
            Intent::EntityIntroduction,
            &["color", "dark blue"],
        )]);
        assert_eq!(
            state.query_entity_memory("favorite_color").unwrap().value,
            "dark blue"
        );
        assert!(state.query_entity_memory("color_name").is_none());
    }

    #[test]
    fn test_intent_decays_out_of_active_set() {
        let mut turns = vec![turn("hello", Intent::Greeting, &[])];
        for i in 0..6 {
            turns.push(turn(&format!("tell me about rust {i}"), Intent::Question, &[]));
        }
        let state = run(&turns);
        assert!(!state.active_intents().contains(&Intent::Greeting));
        assert!(state.active_intents().contains(&Intent::Question));
        let greeting = state.intent_state(&Intent::Greeting).unwrap();
        assert!(!greeting.active);
        assert_eq!(greeting.turns_since_activation, 6);
    }

    #[test]
    fn test_recurring_intent_is_boosted_and_capped() {
        let mut t = turn("hi", Intent::Greeting, &[]);
        t.intent_confidence = Some(0.9);
        let state = run(&[t.clone(), t.clone(), t]);
        let s = state.intent_state(&Intent::Greeting).unwrap();
        assert_eq!(s.confidence, 1.0);
        assert!(s.active);
    }

    #[test]
    fn test_topic_from_table_and_keywords() {
        let state = run(&[turn("hi", Intent::Greeting, &[])]);
        assert_eq!(state.current_topic(), Some("greeting"));

        let state = state.advance(&turn("Tell me about volcanoes", Intent::InformationRequest, &[]));
        assert_eq!(state.current_topic(), Some("volcanoes"));

        let state = state.advance(&turn("what is it?", Intent::Question, &[]));
        assert_eq!(state.current_topic(), Some("general_inquiry"));

        let state = state.advance(&turn("ok", Intent::GeneralConversation, &[]));
        assert_eq!(state.current_topic(), Some("general_inquiry"));
    }

    #[test]
    fn test_goals_deduplicated_and_capped() {
        let state = run(&[
            turn("a", Intent::Greeting, &[]),
            turn("b", Intent::IdentityIntroduction, &[]),
            turn("c", Intent::EntityIntroduction, &[]),
            turn("d", Intent::Question, &[]),
            turn("e", Intent::HelpRequest, &[]),
            turn("f", Intent::Greeting, &[]),
            turn("g", Intent::Farewell, &[]),
        ]);
        assert_eq!(
            state.goals(),
            &[
                "share_information",
                "seek_information",
                "get_assistance",
                "build_rapport",
                "end_conversation"
            ]
        );
    }

    #[test]
    fn test_context_relevant_entities_by_window_or_topic() {
        let old = TurnInput::human(
            "",
            Intent::GeneralConversation,
            vec![EntityMention::typed("pet", "Rex", "personal_entities")],
            0,
        );
        let fresh = TurnInput::human(
            "",
            Intent::GeneralConversation,
            vec![EntityMention::typed("city", "Oslo", "place")],
            10_000,
        );
        let state = MemoryState::default().advance(&old).advance(&fresh);
        let ctx = state.context_for_response(10_000);
        assert!(ctx.relevant_entities.contains_key("city"));
        assert!(!ctx.relevant_entities.contains_key("pet"));

        let state = state.advance(&TurnInput::human(
            "what is my pet called",
            Intent::EntityQuery,
            Vec::new(),
            10_000,
        ));
        let ctx = state.context_for_response(10_000);
        assert!(ctx.relevant_entities.contains_key("pet"));
        assert_eq!(ctx.current_topic.as_deref(), Some("personal_entities"));
    }

    #[test]
    fn test_context_recent_window() {
        let turns: Vec<TurnInput> = (0..8)
            .map(|i| turn(&format!("t{i}"), Intent::GeneralConversation, &[]))
            .collect();
        let ctx = run(&turns).context_for_response(1_000);
        assert_eq!(ctx.recent_history.len(), 5);
        assert_eq!(ctx.recent_history[0].text, "t3");
    }

    #[test]
    fn test_bot_turn_only_touches_history() {
        let state = run(&[turn("hi", Intent::Greeting, &[])]);
        let next = state.with_bot_turn("Hello!", Intent::Greeting, 1_001);
        assert_eq!(next.history_len(), 2);
        assert_eq!(next.last_turn().unwrap().speaker, Speaker::Bot);
        assert_eq!(next.stats().tracked_intents, 1);
        assert_eq!(next.goals(), state.goals());
    }

    #[test]
    fn test_resolve_pronoun_fallback() {
        let c = vec!["car".to_string(), "wife".to_string()];
        assert_eq!(resolve_pronoun("her", &c).as_deref(), Some("wife"));
        assert_eq!(resolve_pronoun("its", &c).as_deref(), Some("car"));
        assert_eq!(resolve_pronoun("his", &[]), None);
    }
}
