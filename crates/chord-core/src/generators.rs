use rand::Rng;

use crate::memory::MemoryState;
use crate::resolver::{self, Resolution};
use crate::tokenizer::extract_keywords;
use crate::turn::{EntityMention, Intent};

pub struct GeneratorContext<'a> {
    pub text: &'a str,
    pub intent: &'a Intent,
    pub entities: &'a [EntityMention],
    /// Memory after this turn has been recorded.
    pub memory: &'a MemoryState,
    pub bot_name: &'a str,
}

struct Generator {
    name: &'static str,
    handles: fn(&Intent) -> bool,
    candidates: fn(&GeneratorContext) -> Vec<String>,
}

/// First generator whose `handles` accepts the intent wins.
const GENERATORS: &[Generator] = &[
    Generator {
        name: "greeting",
        handles: |i| *i == Intent::Greeting,
        candidates: greeting,
    },
    Generator {
        name: "identity_introduction",
        handles: |i| *i == Intent::IdentityIntroduction,
        candidates: identity_introduction,
    },
    Generator {
        name: "entity_introduction",
        handles: |i| *i == Intent::EntityIntroduction,
        candidates: entity_introduction,
    },
    Generator {
        name: "identity_query",
        handles: |i| *i == Intent::IdentityQuery,
        candidates: query,
    },
    Generator {
        name: "entity_query",
        handles: |i| *i == Intent::EntityQuery,
        candidates: query,
    },
    Generator {
        name: "question",
        handles: |i| *i == Intent::Question,
        candidates: question,
    },
    Generator {
        name: "help",
        handles: |i| *i == Intent::HelpRequest,
        candidates: |_| {
            owned(&[
                "I'm here to help. What do you need?",
                "Of course. Tell me what you need help with.",
                "I'd be happy to help. What's going on?",
            ])
        },
    },
    Generator {
        name: "gratitude",
        handles: |i| *i == Intent::Gratitude,
        candidates: |_| owned(&["You're welcome!", "My pleasure.", "Happy to help!"]),
    },
    Generator {
        name: "positive_feedback",
        handles: |i| *i == Intent::PositiveFeedback,
        candidates: |_| {
            owned(&[
                "Thank you, I'm glad that helped!",
                "That's great to hear.",
                "I appreciate that!",
            ])
        },
    },
    Generator {
        name: "information",
        handles: |i| *i == Intent::InformationRequest,
        candidates: information,
    },
    Generator {
        name: "default",
        handles: |_| true,
        candidates: |_| Vec::new(),
    },
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn greeting(ctx: &GeneratorContext) -> Vec<String> {
    match ctx.memory.query_entity_memory("user_name") {
        Some(r) => vec![
            format!("Hello again, {}!", r.value),
            format!("Hi {}, good to see you.", r.value),
        ],
        None => vec![
            format!("Hello! I'm {}. What's your name?", ctx.bot_name),
            "Hi there! How can I help you today?".to_string(),
            "Hello! Nice to meet you.".to_string(),
        ],
    }
}

fn identity_introduction(ctx: &GeneratorContext) -> Vec<String> {
    let name = ctx
        .memory
        .query_entity_memory("user_name")
        .map(|r| r.value.clone())
        .or_else(|| {
            ctx.entities
                .iter()
                .rev()
                .find_map(|e| e.present_value().map(str::to_string))
        });
    match name {
        Some(n) => vec![
            format!("Nice to meet you, {n}!"),
            format!("It's a pleasure to meet you, {n}."),
            format!("Hello {n}, I'll remember your name."),
        ],
        None => owned(&["Nice to meet you!", "It's a pleasure to meet you."]),
    }
}

fn entity_introduction(ctx: &GeneratorContext) -> Vec<String> {
    let last = ctx.entities.iter().rev().find_map(|e| e.present_value());
    let record = last.and_then(|value| {
        ctx.memory
            .entities()
            .values()
            .filter(|r| r.value == value)
            .find_map(|r| Some((r.relationship.as_deref()?, r)))
    });
    match record {
        Some(("self", _)) | None => owned(&[
            "Thanks for sharing that with me.",
            "Got it, I'll keep that in mind.",
        ]),
        Some(("favorite", r)) => {
            let category = r.entity_type.as_deref().unwrap_or("one");
            vec![
                format!("I'll remember that your favorite {category} is {}.", r.value),
                format!("{}, great choice!", r.value),
            ]
        }
        Some((relation, r)) => vec![
            format!("I'll remember that your {relation}'s name is {}.", r.value),
            format!("{} is a lovely name for your {relation}.", r.value),
            format!("Thanks for telling me about your {relation}, {}.", r.value),
        ],
    }
}

fn query(ctx: &GeneratorContext) -> Vec<String> {
    vec![resolver::respond(ctx.text, ctx.memory, ctx.bot_name)]
}

fn question(ctx: &GeneratorContext) -> Vec<String> {
    match resolver::resolve(ctx.text, ctx.memory, ctx.bot_name) {
        Resolution::Answer(answer) => vec![answer],
        unknown @ Resolution::Unknown { .. } => vec![resolver::clarify(ctx.text, &unknown)],
        Resolution::NoMatch => match extract_keywords(ctx.text, 1).first() {
            Some(kw) => vec![
                format!("That's a good question about {kw}."),
                format!("I'm not certain about {kw}, but I'd like to learn more."),
                format!("What made you curious about {kw}?"),
            ],
            None => owned(&["That's a good question.", "Let me think about that."]),
        },
    }
}

fn information(ctx: &GeneratorContext) -> Vec<String> {
    if let Resolution::Answer(answer) = resolver::resolve(ctx.text, ctx.memory, ctx.bot_name) {
        return vec![answer];
    }
    match extract_keywords(ctx.text, 1).first() {
        Some(kw) => vec![
            format!("I'd like to learn about {kw} with you. What do you already know?"),
            format!("I don't know much about {kw} yet. Could you share more?"),
        ],
        None => vec![resolver::NO_INFORMATION.to_string()],
    }
}

/// Name of the generator that handles `intent`.
pub fn generator_name(intent: &Intent) -> &'static str {
    GENERATORS
        .iter()
        .find(|g| (g.handles)(intent))
        .map_or("default", |g| g.name)
}

/// One candidate for this turn, or `None` to let the assembler build the
/// core from its templates.
pub fn generate<R: Rng>(ctx: &GeneratorContext, rng: &mut R) -> Option<String> {
    let generator = GENERATORS.iter().find(|g| (g.handles)(ctx.intent))?;
    let candidates = (generator.candidates)(ctx);
    if candidates.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..candidates.len());
    candidates.into_iter().nth(idx)
}
