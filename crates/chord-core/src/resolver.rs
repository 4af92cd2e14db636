//! Query resolver: answers questions about what the user has said.
//!
//! An ordered table of `{matcher, handler}` pairs. The first pattern whose
//! regex matches the input owns the query; its handler looks in entity
//! memory, then scans raw human turns for the original statement.
//! Anything left unanswered falls through the clarifying cascade.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::constants::{FEMALE_RELATIONS, MALE_RELATIONS, RELATION_NOUNS};
use crate::memory::{MemoryState, resolve_pronoun};
use crate::tokenizer::{extract_keywords, starts_uppercase, tokenize};
use crate::turn::{Intent, Speaker};

pub const NO_INFORMATION: &str = "I don't have that information right now.";

/// Turns scanned for the antecedent of "her"/"his" in a name query.
const PRONOUN_WINDOW: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Answer(String),
    /// A pattern matched but nothing is known about `subject`.
    Unknown {
        pattern: &'static str,
        subject: String,
    },
    NoMatch,
}

struct QueryContext<'a> {
    memory: &'a MemoryState,
    bot_name: &'a str,
}

struct QueryPattern {
    name: &'static str,
    matcher: LazyLock<Regex>,
    handler: fn(&Captures, &QueryContext) -> Result<String, String>,
}

macro_rules! query_pattern {
    ($name:expr, $re:expr, $handler:expr) => {
        QueryPattern {
            name: $name,
            matcher: LazyLock::new(|| Regex::new($re).unwrap()),
            handler: $handler,
        }
    };
}

/// Evaluated in order; the first matching pattern owns the query.
static QUERY_PATTERNS: [QueryPattern; 8] = [
    query_pattern!(
        "bot_identity",
        r"(?i)\bwhat(?:'s|\s+is)\s+your\s+name\b|\bwho\s+are\s+you\b",
        bot_identity
    ),
    query_pattern!(
        "user_name",
        r"(?i)\bwhat(?:'s|\s+is)\s+my\s+name\b|\bwho\s+am\s+i\b",
        user_name
    ),
    query_pattern!(
        "pronoun_name",
        r"(?i)\bwhat(?:'s|\s+is)\s+(her|his|its|their)\s+name\b",
        pronoun_name
    ),
    query_pattern!(
        "possessive_name",
        r"(?i)\bwhat(?:'s|\s+is)\s+my\s+(\w+)'s\s+name\b",
        possessive_name
    ),
    query_pattern!("who_is", r"(?i)\bwho\s+is\s+(\w+)", who_is),
    query_pattern!(
        "favorite",
        r"(?i)\bwhat(?:'s|\s+is)\s+my\s+favou?rite\s+(\w+)",
        favorite
    ),
    query_pattern!(
        "attribute_of",
        r"(?i)\bwhat\s+(\w+)\s+is\s+my\s+(\w+)",
        attribute_of
    ),
    query_pattern!(
        "compound_attribute",
        r"(?i)\bwhat(?:'s|\s+is)\s+my\s+(\w+)\s+(\w+)",
        compound_attribute
    ),
];

/// Human turns, newest first.
fn human_texts<'a>(memory: &'a MemoryState) -> impl Iterator<Item = &'a str> {
    memory
        .history()
        .rev()
        .filter(|t| t.speaker == Speaker::Human)
        .map(|t| t.text.as_str())
}

/// First capture of `pattern` in the newest human turn that has one.
fn scan_history(memory: &MemoryState, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    human_texts(memory)
        .find_map(|text| re.captures(text).map(|c| c[1].trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn bot_identity(_: &Captures, ctx: &QueryContext) -> Result<String, String> {
    Ok(format!("My name is {}.", ctx.bot_name))
}

fn user_name(_: &Captures, ctx: &QueryContext) -> Result<String, String> {
    ctx.memory
        .query_entity_memory("user_name")
        .map(|r| r.value.clone())
        .or_else(|| scan_history(ctx.memory, r"(?i)\bmy\s+name\s+is\s+(\w+)"))
        .map(|name| format!("Your name is {name}."))
        .ok_or_else(|| "name".to_string())
}

/// Relation words mentioned in recent ENTITY_INTRODUCTION turns, newest
/// first, followed by relationships already on record.
fn pronoun_candidates(memory: &MemoryState) -> Vec<String> {
    let known = |w: &str| {
        RELATION_NOUNS.contains(&w) || FEMALE_RELATIONS.contains(&w) || MALE_RELATIONS.contains(&w)
    };
    let mut candidates: Vec<String> = Vec::new();
    let recent_intros = memory
        .history()
        .rev()
        .take(PRONOUN_WINDOW)
        .filter(|t| t.intent == Intent::EntityIntroduction);
    for turn in recent_intros {
        for word in tokenize(&turn.text) {
            let word = word.trim_end_matches("'s").to_string();
            if known(word.as_str()) && !candidates.contains(&word) {
                candidates.push(word);
            }
        }
    }

    let mut on_record: Vec<_> = memory
        .entities()
        .iter()
        .filter(|(k, _)| k.ends_with("_name"))
        .filter_map(|(_, r)| Some((r.last_mentioned, r.relationship.clone()?)))
        .filter(|(_, rel)| rel.as_str() != "self" && known(rel.as_str()))
        .collect();
    on_record.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, rel) in on_record {
        if !candidates.contains(&rel) {
            candidates.push(rel);
        }
    }
    candidates
}

fn pronoun_name(caps: &Captures, ctx: &QueryContext) -> Result<String, String> {
    let pronoun = caps[1].to_lowercase();
    let relation = resolve_pronoun(&pronoun, &pronoun_candidates(ctx.memory))
        .ok_or_else(|| format!("{pronoun} name"))?;
    ctx.memory
        .query_entity_relationship(&relation, "name")
        .map(|r| format!("{} name is {}.", capitalize(&pronoun), r.value))
        .ok_or_else(|| format!("{relation}'s name"))
}

fn possessive_name(caps: &Captures, ctx: &QueryContext) -> Result<String, String> {
    let relation = caps[1].to_lowercase();
    ctx.memory
        .query_entity_relationship(&relation, "name")
        .map(|r| r.value.clone())
        .or_else(|| {
            scan_history(
                ctx.memory,
                &format!(r"(?i)\bmy\s+{}'s\s+name\s+is\s+(\w+)", regex::escape(&relation)),
            )
        })
        .map(|name| format!("Your {relation}'s name is {name}."))
        .ok_or_else(|| format!("{relation}'s name"))
}

fn who_is(caps: &Captures, ctx: &QueryContext) -> Result<String, String> {
    let name = &caps[1];
    let on_record = ctx
        .memory
        .entities()
        .values()
        .filter(|r| r.value.eq_ignore_ascii_case(name))
        .find_map(|r| r.relationship.clone());
    let relation = on_record.or_else(|| {
        scan_history(
            ctx.memory,
            &format!(r"(?i)\bmy\s+(\w+)'s\s+name\s+is\s+{}\b", regex::escape(name)),
        )
    });
    match relation.as_deref() {
        Some("self") => Ok(format!("{} is you.", capitalize(name))),
        Some(rel) => Ok(format!("{} is your {rel}.", capitalize(name))),
        None => Err(capitalize(name)),
    }
}

fn favorite(caps: &Captures, ctx: &QueryContext) -> Result<String, String> {
    let category = caps[1].to_lowercase();
    ctx.memory
        .query_entity_memory(&format!("favorite_{category}"))
        .map(|r| r.value.clone())
        .or_else(|| {
            scan_history(
                ctx.memory,
                &format!(
                    r"(?i)\bmy\s+favou?rite\s+{}\s+is\s+([^.,!?;]+)",
                    regex::escape(&category)
                ),
            )
        })
        .map(|value| format!("Your favorite {category} is {value}."))
        .ok_or_else(|| format!("favorite {category}"))
}

fn attribute_of(caps: &Captures, ctx: &QueryContext) -> Result<String, String> {
    let attribute = caps[1].to_lowercase();
    let owner = caps[2].to_lowercase();
    lookup_attribute(ctx, &owner, &attribute)
}

fn compound_attribute(caps: &Captures, ctx: &QueryContext) -> Result<String, String> {
    let owner = caps[1].to_lowercase();
    let attribute = caps[2].to_lowercase();
    lookup_attribute(ctx, &owner, &attribute)
}

fn lookup_attribute(ctx: &QueryContext, owner: &str, attribute: &str) -> Result<String, String> {
    let (o, a) = (regex::escape(owner), regex::escape(attribute));
    ctx.memory
        .query_entity_relationship(owner, attribute)
        .map(|r| r.value.clone())
        .or_else(|| {
            scan_history(
                ctx.memory,
                &format!(r"(?i)\bmy\s+{o}(?:'s)?\s+{a}\s+is\s+(\w+)"),
            )
        })
        .or_else(|| {
            // a lowercase value after "my X is" describes X rather than naming it
            scan_history(
                ctx.memory,
                &format!(r"(?i)\bmy\s+{o}\s+is\s+(?:(?:a|an|the)\s+)?(\w+)"),
            )
            .filter(|value| attribute != "name" || starts_uppercase(value))
        })
        .map(|value| format!("Your {owner}'s {attribute} is {value}."))
        .ok_or_else(|| format!("{owner}'s {attribute}"))
}

/// Run the pattern table against `text`.
pub fn resolve(text: &str, memory: &MemoryState, bot_name: &str) -> Resolution {
    let ctx = QueryContext { memory, bot_name };
    for pattern in &QUERY_PATTERNS {
        let Some(caps) = pattern.matcher.captures(text) else {
            continue;
        };
        tracing::debug!(pattern = pattern.name, "query pattern matched");
        return match (pattern.handler)(&caps, &ctx) {
            Ok(answer) => Resolution::Answer(answer),
            Err(subject) => Resolution::Unknown {
                pattern: pattern.name,
                subject,
            },
        };
    }
    Resolution::NoMatch
}

struct Clarifier {
    applies: fn(&str, &Resolution) -> bool,
    respond: fn(&str, &Resolution) -> String,
}

/// Tried in order after a failed lookup; the catch-all closes the list.
const CLARIFIERS: &[Clarifier] = &[
    Clarifier {
        applies: |_, r| matches!(r, Resolution::Unknown { pattern: "who_is", .. }),
        respond: |_, r| match r {
            Resolution::Unknown { subject, .. } => {
                format!("I don't think you've told me who {subject} is yet.")
            }
            _ => NO_INFORMATION.to_string(),
        },
    },
    Clarifier {
        applies: |_, r| matches!(r, Resolution::Unknown { .. }),
        respond: |_, r| match r {
            Resolution::Unknown { subject, .. } => {
                format!("I don't know your {subject} yet. Would you like to tell me?")
            }
            _ => NO_INFORMATION.to_string(),
        },
    },
    Clarifier {
        applies: |text, _| text.to_lowercase().contains("remember"),
        respond: |_, _| "I don't remember you mentioning that. Could you remind me?".to_string(),
    },
    Clarifier {
        applies: |text, _| !extract_keywords(text, 1).is_empty() && text.trim_end().ends_with('?'),
        respond: |text, _| {
            let keyword = extract_keywords(text, 1).into_iter().next().unwrap_or_default();
            format!("I'm not sure about {keyword}. Could you tell me more?")
        },
    },
];

/// Turn a failed resolution into a clarifying reply.
pub fn clarify(text: &str, resolution: &Resolution) -> String {
    CLARIFIERS
        .iter()
        .find(|c| (c.applies)(text, resolution))
        .map(|c| (c.respond)(text, resolution))
        .unwrap_or_else(|| NO_INFORMATION.to_string())
}

/// The answer if one is known, otherwise a clarifying reply.
pub fn respond(text: &str, memory: &MemoryState, bot_name: &str) -> String {
    match resolve(text, memory, bot_name) {
        Resolution::Answer(answer) => answer,
        other => clarify(text, &other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::{TurnInput, positional_entities};

    fn remember(turns: &[(&str, Intent, &[&str])]) -> MemoryState {
        turns.iter().enumerate().fold(MemoryState::default(), |m, (i, (text, intent, values))| {
            m.advance(&TurnInput::human(
                text,
                intent.clone(),
                positional_entities(values.iter().copied()),
                1_000 + i as u64,
            ))
        })
    }

    fn answer(memory: &MemoryState, text: &str) -> Resolution {
        resolve(text, memory, "Chord")
    }

    #[test]
    fn test_bot_identity() {
        let m = MemoryState::default();
        assert_eq!(
            answer(&m, "What's your name?"),
            Resolution::Answer("My name is Chord.".into())
        );
    }

    #[test]
    fn test_user_name_from_memory() {
        let m = remember(&[("My name is Alice", Intent::IdentityIntroduction, &["name", "Alice"])]);
        assert_eq!(
            answer(&m, "What is my name?"),
            Resolution::Answer("Your name is Alice.".into())
        );
    }

    #[test]
    fn test_user_name_from_history_scan() {
        // lowercase name is rejected by memory but still in history
        let m = remember(&[("my name is bob", Intent::IdentityIntroduction, &["name", "bob"])]);
        assert!(m.query_entity_memory("user_name").is_none());
        assert_eq!(
            answer(&m, "who am i"),
            Resolution::Answer("Your name is bob.".into())
        );
    }

    #[test]
    fn test_possessive_name() {
        let m = remember(&[(
            "My dog's name is Buddy",
            Intent::EntityIntroduction,
            &["dog", "Buddy"],
        )]);
        assert_eq!(
            answer(&m, "What is my dog's name?"),
            Resolution::Answer("Your dog's name is Buddy.".into())
        );
        assert_eq!(
            answer(&m, "Who is Buddy?"),
            Resolution::Answer("Buddy is your dog.".into())
        );
    }

    #[test]
    fn test_pronoun_name_prefers_gendered_relation() {
        let m = remember(&[
            ("My dog's name is Rex", Intent::EntityIntroduction, &["dog", "Rex"]),
            ("My brother's name is Tom", Intent::EntityIntroduction, &["brother", "Tom"]),
            ("My wife's name is Sarah", Intent::EntityIntroduction, &["wife", "Sarah"]),
        ]);
        assert_eq!(
            answer(&m, "what is her name"),
            Resolution::Answer("Her name is Sarah.".into())
        );
        assert_eq!(
            answer(&m, "what is his name"),
            Resolution::Answer("His name is Tom.".into())
        );
    }

    #[test]
    fn test_favorite_and_attributes() {
        let m = remember(&[
            ("My favorite color is blue", Intent::EntityIntroduction, &["color", "blue"]),
            ("my car is red", Intent::GeneralConversation, &[]),
        ]);
        assert_eq!(
            answer(&m, "What's my favorite color?"),
            Resolution::Answer("Your favorite color is blue.".into())
        );
        assert_eq!(
            answer(&m, "what color is my car"),
            Resolution::Answer("Your car's color is red.".into())
        );
    }

    #[test]
    fn test_description_is_not_a_name() {
        let m = remember(&[(
            "My dog is a labrador",
            Intent::EntityIntroduction,
            &["dog", "labrador"],
        )]);
        assert!(m.query_entity_memory("dog_name").is_none());
        assert!(matches!(
            answer(&m, "what is my dog name"),
            Resolution::Unknown { .. }
        ));
        assert_eq!(
            answer(&m, "what breed is my dog"),
            Resolution::Answer("Your dog's breed is labrador.".into())
        );

        let m = remember(&[("my cat is Tom", Intent::GeneralConversation, &[])]);
        assert_eq!(
            answer(&m, "what is my cat name"),
            Resolution::Answer("Your cat's name is Tom.".into())
        );
    }

    #[test]
    fn test_unknown_subject_is_reported() {
        let m = MemoryState::default();
        assert_eq!(
            answer(&m, "What is my cat's name?"),
            Resolution::Unknown {
                pattern: "possessive_name",
                subject: "cat's name".into()
            }
        );
        assert_eq!(answer(&m, "nice weather"), Resolution::NoMatch);
    }

    #[test]
    fn test_clarifying_cascade() {
        let m = MemoryState::default();
        assert_eq!(
            respond("What is my cat's name?", &m, "Chord"),
            "I don't know your cat's name yet. Would you like to tell me?"
        );
        assert_eq!(
            respond("Who is Zed?", &m, "Chord"),
            "I don't think you've told me who Zed is yet."
        );
        assert_eq!(
            respond("Why are volcanoes hot?", &m, "Chord"),
            "I'm not sure about volcanoes. Could you tell me more?"
        );
        assert_eq!(respond("hmm", &m, "Chord"), NO_INFORMATION);
    }
}
