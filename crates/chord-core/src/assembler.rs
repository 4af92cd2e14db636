use serde::Serialize;

use crate::config::StyleConfig;
use crate::flow::{FlowState, Phase, ResponseType};
use crate::memory::MemoryState;
use crate::ontology::Ontology;
use crate::resolver;
use crate::templates::{self, Style, Verbosity, select_style};
use crate::turn::Intent;

/// Everything the assembler reads for one reply.
pub struct AssemblyContext<'a> {
    pub text: &'a str,
    pub intent: &'a Intent,
    pub flow: &'a FlowState,
    pub memory: &'a MemoryState,
    /// Words the reply may follow up on, best first.
    pub focus_words: &'a [String],
    pub ontology: &'a dyn Ontology,
    pub style: &'a StyleConfig,
    pub bot_name: &'a str,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Response {
    pub opening: String,
    pub core: String,
    pub followup: String,
    pub closing: String,
}

impl Response {
    /// Non-empty parts joined by single spaces.
    pub fn text(&self) -> String {
        [&self.opening, &self.core, &self.followup, &self.closing]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn wants_opening(response_type: ResponseType, style: &Style) -> bool {
    style.verbosity != Verbosity::Concise
        && matches!(
            response_type,
            ResponseType::Informative
                | ResponseType::DetailedExplanation
                | ResponseType::Supportive
                | ResponseType::Exploratory
                | ResponseType::Bridging
        )
}

/// Ask about the first property of a focus word's type that memory does
/// not already hold, e.g. "What breed is your dog?".
pub fn contextual_followup(
    focus_words: &[String],
    ontology: &dyn Ontology,
    memory: &MemoryState,
) -> Option<String> {
    focus_words.iter().find_map(|word| {
        let word = word.to_lowercase();
        let ty = ontology.infer_type(&word)?;
        let property = ontology
            .valid_properties(ty)
            .iter()
            .find(|p| memory.query_entity_relationship(&word, p).is_none())?;
        Some(format!("What's your {word}'s {property}?"))
    })
}

/// Core content chosen by response type. Informative types go through the
/// query resolver.
pub fn core_content(ctx: &AssemblyContext, style: &Style) -> String {
    let response_type = ctx.flow.expected_response_type;
    if response_type.is_informative() {
        resolver::respond(ctx.text, ctx.memory, ctx.bot_name)
    } else {
        templates::core(response_type, style).to_string()
    }
}

/// Build a reply. `core_override` replaces the generated core content.
pub fn assemble(ctx: &AssemblyContext, core_override: Option<String>) -> Response {
    let response_type = ctx.flow.expected_response_type;
    let style = select_style(ctx.flow.phase, ctx.intent, ctx.flow.momentum, ctx.style);
    tracing::debug!(?response_type, ?style, "assembling response");

    let core = core_override.unwrap_or_else(|| core_content(ctx, &style));

    let opening = if wants_opening(response_type, &style) {
        templates::opening(response_type, &style).to_string()
    } else {
        String::new()
    };

    let followup = if style.verbosity == Verbosity::Concise
        || matches!(response_type, ResponseType::Farewell | ResponseType::Greeting)
        || core.trim_end().ends_with('?')
    {
        String::new()
    } else {
        contextual_followup(ctx.focus_words, ctx.ontology, ctx.memory)
            .unwrap_or_else(|| templates::followup(&style).to_string())
    };

    let closing = if style.verbosity == Verbosity::Detailed || ctx.flow.phase == Phase::Closing {
        templates::closing(&style).to_string()
    } else {
        String::new()
    };

    Response {
        opening,
        core,
        followup,
        closing,
    }
}
