use serde::Serialize;

use crate::config::StyleConfig;
use crate::flow::{Phase, ResponseType};
use crate::turn::Intent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    Casual,
    Neutral,
    Formal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Enthusiasm {
    Low,
    Medium,
    High,
}

impl Enthusiasm {
    fn index(self) -> usize {
        match self {
            Enthusiasm::Low => 0,
            Enthusiasm::Medium => 1,
            Enthusiasm::High => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Concise,
    Balanced,
    Detailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Friendly,
    Curious,
    Supportive,
    Thoughtful,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Style {
    pub formality: Formality,
    pub enthusiasm: Enthusiasm,
    pub verbosity: Verbosity,
    pub personality: Personality,
}

/// Style for one reply. Momentum drives enthusiasm and verbosity; intent
/// and phase pick formality and personality.
pub fn select_style(phase: Phase, intent: &Intent, momentum: f64, cfg: &StyleConfig) -> Style {
    let (enthusiasm, mut verbosity) = if momentum >= cfg.high_momentum {
        (Enthusiasm::High, Verbosity::Detailed)
    } else if momentum <= cfg.low_momentum {
        (Enthusiasm::Low, Verbosity::Concise)
    } else {
        (Enthusiasm::Medium, Verbosity::Balanced)
    };
    if phase == Phase::Deepening && verbosity == Verbosity::Concise {
        verbosity = Verbosity::Balanced;
    }

    let formality = match intent {
        Intent::HelpRequest | Intent::NegativeFeedback => Formality::Formal,
        Intent::Greeting | Intent::Gratitude | Intent::PositiveFeedback | Intent::Farewell => {
            Formality::Casual
        }
        _ => Formality::Neutral,
    };

    let personality = match intent {
        Intent::HelpRequest | Intent::NegativeFeedback => Personality::Supportive,
        i if i.is_query() => Personality::Thoughtful,
        _ if matches!(phase, Phase::Exploration | Phase::Deepening) => Personality::Curious,
        _ => Personality::Friendly,
    };

    Style {
        formality,
        enthusiasm,
        verbosity,
        personality,
    }
}

/// (low, medium, high) enthusiasm.
type Variants = [&'static str; 3];

const OPENINGS: &[(ResponseType, Variants)] = &[
    (
        ResponseType::Informative,
        ["", "Let me think.", "Great question!"],
    ),
    (
        ResponseType::DetailedExplanation,
        ["Let me go into that.", "Let's dig into this.", "Oh, I love digging into this!"],
    ),
    (
        ResponseType::Supportive,
        ["", "I'm here to help.", "I'd be glad to help!"],
    ),
    (
        ResponseType::Exploratory,
        ["", "That's worth exploring.", "Ooh, that's interesting!"],
    ),
    (
        ResponseType::Bridging,
        ["", "That connects to what we discussed.", "That ties in nicely!"],
    ),
];

const CORES: &[(ResponseType, Variants)] = &[
    (
        ResponseType::Greeting,
        ["Hello.", "Hello! How are you today?", "Hi there! It's great to see you!"],
    ),
    (
        ResponseType::Farewell,
        ["Goodbye.", "Goodbye! Take care.", "Bye! It was wonderful talking with you!"],
    ),
    (
        ResponseType::Acknowledgment,
        ["Noted.", "Got it, thanks for telling me.", "Wonderful, thanks for sharing that!"],
    ),
    (
        ResponseType::Informative,
        [
            "I don't have that information right now.",
            "I don't have that information right now.",
            "I don't have that information right now.",
        ],
    ),
    (
        ResponseType::DetailedExplanation,
        [
            "I don't have that information right now.",
            "I don't have that information right now.",
            "I don't have that information right now.",
        ],
    ),
    (
        ResponseType::Supportive,
        [
            "I'll do what I can.",
            "Let's work through it together.",
            "We'll figure this out together!",
        ],
    ),
    (
        ResponseType::Appreciative,
        ["Thank you.", "Thanks, I appreciate that.", "Thank you so much, that means a lot!"],
    ),
    (
        ResponseType::Conversational,
        ["I see.", "That's interesting.", "That's really interesting!"],
    ),
    (
        ResponseType::Exploratory,
        [
            "Tell me more.",
            "What else comes to mind about that?",
            "I'd love to hear more about that!",
        ],
    ),
    (
        ResponseType::Bridging,
        [
            "Let's move on.",
            "Shall we look at something new?",
            "Let's explore something new together!",
        ],
    ),
];

/// Formal phrasing that replaces the matching `CORES` row.
const FORMAL_CORES: &[(ResponseType, Variants)] = &[
    (
        ResponseType::Supportive,
        [
            "I will do what I can.",
            "Let us work through this together.",
            "I would be glad to work through this with you.",
        ],
    ),
    (
        ResponseType::Acknowledgment,
        ["Noted.", "Thank you for letting me know.", "Thank you, I appreciate you telling me."],
    ),
];

const FOLLOWUPS: &[(Personality, Variants)] = &[
    (
        Personality::Friendly,
        [
            "Anything else?",
            "What else is on your mind?",
            "What else would you like to chat about?",
        ],
    ),
    (
        Personality::Curious,
        ["Why do you ask?", "What got you thinking about that?", "I'm curious, what sparked that?"],
    ),
    (
        Personality::Supportive,
        [
            "Does that help?",
            "Is there anything else I can do?",
            "Let me know how else I can help!",
        ],
    ),
    (
        Personality::Thoughtful,
        [
            "Anything else you'd like to know?",
            "Is there anything else you'd like to know?",
            "What else would you like to find out?",
        ],
    ),
];

const CLOSINGS: &[(Personality, Variants)] = &[
    (
        Personality::Friendly,
        ["", "Happy to chat.", "Always happy to chat!"],
    ),
    (
        Personality::Curious,
        ["", "I enjoy these conversations.", "I really enjoy these conversations!"],
    ),
    (
        Personality::Supportive,
        ["", "I'm here whenever you need me.", "I'm always here for you!"],
    ),
    (
        Personality::Thoughtful,
        ["", "I hope that helps.", "I hope that helps a lot!"],
    ),
];

fn pick<K: PartialEq>(table: &[(K, Variants)], key: K, enthusiasm: Enthusiasm) -> &'static str {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v[enthusiasm.index()])
        .unwrap_or("")
}

pub fn opening(response_type: ResponseType, style: &Style) -> &'static str {
    pick(OPENINGS, response_type, style.enthusiasm)
}

pub fn core(response_type: ResponseType, style: &Style) -> &'static str {
    if style.formality == Formality::Formal {
        let formal = pick(FORMAL_CORES, response_type, style.enthusiasm);
        if !formal.is_empty() {
            return formal;
        }
    }
    pick(CORES, response_type, style.enthusiasm)
}

pub fn followup(style: &Style) -> &'static str {
    pick(FOLLOWUPS, style.personality, style.enthusiasm)
}

pub fn closing(style: &Style) -> &'static str {
    pick(CLOSINGS, style.personality, style.enthusiasm)
}
