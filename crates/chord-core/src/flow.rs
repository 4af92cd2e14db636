//! Discourse flow: conversation phase state machine, topic tracking,
//! momentum, discourse markers and the expected response type.
//!
//! Phases move opening → exploration → deepening ⇄ transition, with
//! transition falling back to exploration. Rules are evaluated against the
//! current phase only, once per turn.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::FlowConfig;
use crate::turn::{EntityMention, Intent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Opening,
    Exploration,
    Deepening,
    Transition,
    Closing,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Opening => "opening",
            Phase::Exploration => "exploration",
            Phase::Deepening => "deepening",
            Phase::Transition => "transition",
            Phase::Closing => "closing",
        }
    }

    /// Moves the conversation is expected to make next in this phase.
    pub fn expected_moves(self) -> &'static [&'static str] {
        match self {
            Phase::Opening => &["greeting", "introduction", "small_talk"],
            Phase::Exploration => &["question", "topic_introduction", "information_sharing"],
            Phase::Deepening => &["elaboration", "detailed_question", "clarification"],
            Phase::Transition => &["topic_shift", "summary", "new_question"],
            Phase::Closing => &["farewell", "gratitude", "summary"],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Greeting,
    Farewell,
    Acknowledgment,
    Informative,
    DetailedExplanation,
    Supportive,
    Appreciative,
    Conversational,
    Exploratory,
    Bridging,
}

impl ResponseType {
    pub fn is_informative(self) -> bool {
        matches!(self, ResponseType::Informative | ResponseType::DetailedExplanation)
    }

    fn for_intent(intent: &Intent) -> Self {
        match intent {
            Intent::Greeting => ResponseType::Greeting,
            Intent::Farewell => ResponseType::Farewell,
            Intent::IdentityIntroduction | Intent::EntityIntroduction => {
                ResponseType::Acknowledgment
            }
            Intent::IdentityQuery
            | Intent::EntityQuery
            | Intent::Question
            | Intent::InformationRequest => ResponseType::Informative,
            Intent::HelpRequest | Intent::NegativeFeedback => ResponseType::Supportive,
            Intent::Gratitude | Intent::PositiveFeedback => ResponseType::Appreciative,
            Intent::GeneralConversation | Intent::Other(_) => ResponseType::Conversational,
        }
    }

    /// Phase-specific adjustment of the intent's response type.
    fn adjusted_for(self, phase: Phase) -> Self {
        match (phase, self) {
            (Phase::Deepening, ResponseType::Informative) => ResponseType::DetailedExplanation,
            (Phase::Deepening, ResponseType::Conversational) => ResponseType::Exploratory,
            (Phase::Transition, ResponseType::Conversational) => ResponseType::Bridging,
            (Phase::Closing, ResponseType::Conversational) => ResponseType::Farewell,
            (_, t) => t,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscourseMarker {
    TopicShift,
    Elaboration,
    Contrast,
    Conclusion,
    Clarification,
    Sequence,
}

const MARKER_PHRASES: &[(DiscourseMarker, &[&str])] = &[
    (
        DiscourseMarker::TopicShift,
        &["by the way", "speaking of", "anyway", "on another note", "changing the subject"],
    ),
    (
        DiscourseMarker::Elaboration,
        &["for example", "for instance", "in other words", "specifically", "moreover", "furthermore"],
    ),
    (
        DiscourseMarker::Contrast,
        &["but ", "however", "on the other hand", "although", "whereas", "instead"],
    ),
    (
        DiscourseMarker::Conclusion,
        &["in conclusion", "to sum up", "overall", "in summary", "all in all"],
    ),
    (
        DiscourseMarker::Clarification,
        &["i mean", "to clarify", "what i meant", "let me rephrase", "that is to say"],
    ),
    (
        DiscourseMarker::Sequence,
        &["first", "second", "then", "next", "after that", "finally"],
    ),
];

/// Marker categories whose phrases occur in `text`, in category order.
pub fn detect_discourse_markers(text: &str) -> Vec<DiscourseMarker> {
    let lower = text.to_lowercase();
    MARKER_PHRASES
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(marker, _)| *marker)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopicState {
    pub current: Option<String>,
    pub history: Vec<String>,
    /// topic → topics that followed it, in first-seen order.
    pub transitions: BTreeMap<String, Vec<String>>,
    pub depth: u32,
    pub coherence: f64,
}

impl Default for TopicState {
    fn default() -> Self {
        Self {
            current: None,
            history: Vec::new(),
            transitions: BTreeMap::new(),
            depth: 0,
            coherence: 1.0,
        }
    }
}

impl TopicState {
    /// depth / (depth + 1): how settled the current topic is.
    pub fn continuity(&self) -> f64 {
        let d = f64::from(self.depth);
        d / (d + 1.0)
    }

    /// Apply a candidate topic. Returns true when the topic changed from a
    /// previous one.
    fn observe(&mut self, candidate: String) -> bool {
        match self.current.take() {
            Some(current) if current == candidate => {
                self.depth += 1;
                self.coherence = (self.coherence + 0.1).min(1.0);
                self.current = Some(current);
                false
            }
            Some(previous) => {
                let successors = self.transitions.entry(previous.clone()).or_default();
                let known = successors.contains(&candidate);
                if !known {
                    successors.push(candidate.clone());
                }
                self.coherence = if known { 0.6 } else { 0.3 };
                self.history.push(previous);
                self.current = Some(candidate);
                self.depth = 0;
                true
            }
            None => {
                self.current = Some(candidate);
                self.depth = 0;
                false
            }
        }
    }
}

/// Per-turn input to the flow stage.
#[derive(Clone, Debug)]
pub struct FlowInput<'a> {
    pub text: &'a str,
    pub intent: &'a Intent,
    pub entities: &'a [EntityMention],
}

#[derive(Clone, Debug, Serialize)]
pub struct FlowState {
    #[serde(skip)]
    config: FlowConfig,
    pub phase: Phase,
    pub turns_since_phase_change: u32,
    pub expected_next_moves: Vec<String>,
    pub momentum: f64,
    pub topic: TopicState,
    pub discourse_markers: Vec<DiscourseMarker>,
    pub expected_response_type: ResponseType,
    pub topic_transitioned: bool,
}

impl Default for FlowState {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

fn moves(phase: Phase) -> Vec<String> {
    phase.expected_moves().iter().map(|m| m.to_string()).collect()
}

fn topic_for_intent(intent: &Intent) -> Option<&'static str> {
    match intent {
        Intent::Greeting => Some("greeting"),
        Intent::Farewell => Some("farewell"),
        Intent::IdentityIntroduction => Some("personal_introduction"),
        Intent::IdentityQuery => Some("identity"),
        Intent::EntityIntroduction | Intent::EntityQuery => Some("personal_details"),
        Intent::Question | Intent::InformationRequest => Some("information"),
        Intent::HelpRequest => Some("assistance"),
        Intent::Gratitude | Intent::PositiveFeedback | Intent::NegativeFeedback => {
            Some("feedback")
        }
        Intent::GeneralConversation | Intent::Other(_) => None,
    }
}

impl FlowState {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            phase: Phase::Opening,
            turns_since_phase_change: 0,
            expected_next_moves: moves(Phase::Opening),
            momentum: 0.0,
            topic: TopicState::default(),
            discourse_markers: Vec::new(),
            expected_response_type: ResponseType::Greeting,
            topic_transitioned: false,
        }
    }

    /// Process one turn and return the next snapshot.
    pub fn advance(&self, input: &FlowInput) -> Self {
        let mut next = self.clone();
        next.turns_since_phase_change += 1;

        let candidate = next.candidate_topic(input);
        next.topic_transitioned = next.topic.observe(candidate);

        next.update_momentum(input.intent);
        if let Some(phase) = next.next_phase(input.intent) {
            tracing::debug!(from = %next.phase, to = %phase, "phase change");
            next.phase = phase;
            next.turns_since_phase_change = 0;
            next.expected_next_moves = moves(phase);
        }

        next.discourse_markers = detect_discourse_markers(input.text);
        next.expected_response_type =
            ResponseType::for_intent(input.intent).adjusted_for(next.phase);
        next
    }

    /// Typed entity → `{type}_discussion`; otherwise the intent's label;
    /// general conversation continues the current topic.
    fn candidate_topic(&self, input: &FlowInput) -> String {
        if let Some(kind) = input
            .entities
            .iter()
            .filter(|e| e.present_value().is_some())
            .find_map(|e| e.kind.as_deref())
        {
            return format!("{kind}_discussion");
        }
        if let Some(topic) = topic_for_intent(input.intent) {
            return topic.to_string();
        }
        self.topic
            .current
            .clone()
            .unwrap_or_else(|| "general".to_string())
    }

    fn update_momentum(&mut self, intent: &Intent) {
        let cfg = &self.config;
        let delta = if intent.is_introduction() {
            cfg.introduction_momentum
        } else if intent.is_query() {
            cfg.question_momentum
        } else if intent.is_general() {
            -cfg.idle_momentum_penalty
        } else {
            0.0
        };
        self.momentum = ((self.momentum + delta) * cfg.momentum_decay).clamp(0.0, 1.0);
    }

    fn next_phase(&self, intent: &Intent) -> Option<Phase> {
        let cfg = &self.config;
        let turns = self.turns_since_phase_change;

        if *intent == Intent::Farewell && self.phase != Phase::Closing {
            return Some(Phase::Closing);
        }

        match self.phase {
            Phase::Opening => (intent.is_introduction() || turns > cfg.opening_max_turns)
                .then_some(Phase::Exploration),
            Phase::Exploration => {
                if self.topic.depth >= cfg.deepening_depth {
                    Some(Phase::Deepening)
                } else if self.topic.history.len() >= cfg.churn_history
                    || (self.topic_transitioned && turns >= 1)
                {
                    Some(Phase::Transition)
                } else {
                    None
                }
            }
            Phase::Deepening => (self.topic_transitioned || turns > cfg.deepening_max_turns)
                .then_some(Phase::Transition),
            Phase::Transition => (self.topic.depth > 0 || turns > cfg.transition_max_turns)
                .then_some(Phase::Exploration),
            Phase::Closing => (*intent == Intent::Greeting).then_some(Phase::Opening),
        }
    }
}
