//! Conversation orchestrator: one backend analysis per turn, then the
//! memory → flow → assembler pipeline, response signature synthesis and the
//! tone pass.
//!
//! Conversation state is a [`Session`] snapshot. Every stage returns a new
//! snapshot and the orchestrator commits them together only once the whole
//! turn has succeeded, so a failing backend call leaves the conversation
//! exactly as it was before the turn.

use rand::Rng;
use serde::Serialize;

use crate::assembler::{self, AssemblyContext};
use crate::backend::{InferenceBackend, analyze};
use crate::config::{ChordConfig, ResponseConfig};
use crate::error::{ChordError, Result};
use crate::flow::{FlowInput, FlowState, Phase};
use crate::generators::{self, GeneratorContext};
use crate::memory::{MemoryState, MemoryStats};
use crate::ontology::{Ontology, StaticOntology};
use crate::resonance::{ResonanceResult, Vocabulary, apply_contextual_weighting, rank};
use crate::signature::{PrimeSignature, SignatureEncoder};
use crate::time::{now_unix_secs, to_iso8601};
use crate::tone::{self, Tone};
use crate::turn::{Intent, TurnInput};
use crate::user_model::{Observation, UserModel};

/// How the response signature was derived from the input signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Input already coheres with the bot: amplify it.
    Amplified,
    /// Input is foreign to the bot: build harmonics of its strongest primes.
    Harmonic,
}

/// Response signature for an input, given the bot's current signature.
pub fn response_signature(
    input: &PrimeSignature,
    bot: &PrimeSignature,
    cfg: &ResponseConfig,
) -> (PrimeSignature, Strategy, f64) {
    let coherence = input.coherence(bot);
    let (base, strategy) = if coherence > cfg.coherence_threshold {
        let understanding = PrimeSignature::from_pairs(cfg.understanding_primes.iter().copied());
        (
            input.amplified(cfg.amplification).merged(&understanding),
            Strategy::Amplified,
        )
    } else {
        let harmonics = PrimeSignature::from_pairs(
            input
                .top_primes(cfg.harmonic_top)
                .into_iter()
                .map(|(p, w)| (p + 2, ((w as f64 * cfg.harmonic_scale).floor() as u64).max(1))),
        );
        let knowledge = PrimeSignature::from_pairs(cfg.knowledge_primes.iter().copied());
        (harmonics.merged(&knowledge), Strategy::Harmonic)
    };
    let personality = PrimeSignature::from_pairs(cfg.personality_primes.iter().copied());
    (base.merged(&personality), strategy, coherence)
}

/// Everything one conversation carries between turns.
#[derive(Clone, Debug)]
struct Session {
    memory: MemoryState,
    flow: FlowState,
    human: UserModel,
    bot: UserModel,
    last_coherence: f64,
    started_at: u64,
}

impl Session {
    fn new(config: &ChordConfig) -> Self {
        Self {
            memory: MemoryState::new(config.memory.clone()),
            flow: FlowState::new(config.flow.clone()),
            human: UserModel::new(&config.human_name),
            bot: UserModel::new(&config.bot_name),
            last_coherence: 0.0,
            started_at: now_unix_secs(),
        }
    }
}

/// Result of one processed turn.
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    pub response: String,
    pub intent: Intent,
    pub intent_confidence: f64,
    pub phase: Phase,
    pub topic: Option<String>,
    pub coherence: f64,
    pub strategy: Strategy,
    pub generator: &'static str,
    pub resonant_words: Vec<ResonanceResult>,
    pub input_signature: PrimeSignature,
    pub response_signature: PrimeSignature,
}

#[derive(Clone, Debug, Serialize)]
pub struct DebugInfo {
    pub human: UserModel,
    pub bot: UserModel,
    pub coherence: f64,
    pub memory: MemoryStats,
    pub phase: Phase,
    pub momentum: f64,
    pub topic: Option<String>,
    pub vocabulary_size: usize,
    /// Session start, ISO-8601 UTC.
    pub started_at: String,
}

pub struct Orchestrator<B, R> {
    config: ChordConfig,
    backend: B,
    ontology: Box<dyn Ontology + Send + Sync>,
    rng: R,
    encoder: SignatureEncoder,
    vocabulary: Vocabulary,
    session: Option<Session>,
}

impl<B: InferenceBackend, R: Rng + Send> Orchestrator<B, R> {
    /// Build an orchestrator over the built-in ontology extended by
    /// `config.ontology`. Call [`Orchestrator::initialize`] before use.
    pub fn new(config: ChordConfig, backend: B, rng: R) -> Self {
        let ontology = StaticOntology::with_config(&config.ontology);
        let encoder = SignatureEncoder::new(config.encoder.threshold);
        Self {
            config,
            backend,
            ontology: Box::new(ontology),
            rng,
            encoder,
            vocabulary: Vocabulary::new(),
            session: None,
        }
    }

    pub fn with_ontology(mut self, ontology: impl Ontology + Send + Sync + 'static) -> Self {
        self.ontology = Box::new(ontology);
        self
    }

    pub fn config(&self) -> &ChordConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Validate configuration, encode the ontology vocabulary and open a
    /// fresh conversation.
    pub async fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;

        let words: Vec<String> = self.ontology.words().into_iter().map(str::to_string).collect();
        let mut vocabulary = Vocabulary::new();
        for word in &words {
            let embedding = self.backend.encode(word).await?;
            vocabulary.insert(word, self.encoder.encode(&embedding));
        }

        self.vocabulary = vocabulary;
        self.session = Some(Session::new(&self.config));
        tracing::info!(
            bot = %self.config.bot_name,
            vocabulary = self.vocabulary.len(),
            "orchestrator initialized"
        );
        Ok(())
    }

    /// Clear all conversation state. The vocabulary is kept.
    pub fn reset(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Err(ChordError::NotInitialized);
        }
        self.session = Some(Session::new(&self.config));
        tracing::info!("conversation reset");
        Ok(())
    }

    pub async fn process(&mut self, text: &str) -> Result<String> {
        self.process_turn(text).await.map(|outcome| outcome.response)
    }

    /// Run texts through the conversation strictly in order.
    pub async fn process_batch<S: AsRef<str>>(&mut self, texts: &[S]) -> Vec<Result<String>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.process(text.as_ref()).await);
        }
        out
    }

    pub async fn process_turn(&mut self, text: &str) -> Result<TurnOutcome> {
        let session = self.session.as_ref().ok_or(ChordError::NotInitialized)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ChordError::EmptyInput);
        }

        let analysis = analyze(&self.backend, text).await.inspect_err(|e| {
            tracing::warn!(error = %e, "backend failed while analysing input");
        })?;
        let intent = analysis.intent();
        let entities = analysis.entity_mentions();
        let input_signature = self.encoder.encode(&analysis.embedding);
        let now = now_unix_secs();

        let human = session.human.observed(&Observation {
            text,
            embedding: &analysis.embedding,
            signature: &input_signature,
            emotion: Some(&analysis.emotion),
        });

        let memory = session.memory.advance(&TurnInput {
            intent_confidence: Some(analysis.intent.confidence),
            ..TurnInput::human(text, intent.clone(), entities.clone(), now)
        });
        let flow = session.flow.advance(&FlowInput {
            text,
            intent: &intent,
            entities: &entities,
        });
        tracing::debug!(
            intent = %intent,
            phase = %flow.phase,
            topic = ?memory.current_topic(),
            momentum = flow.momentum,
            "stages advanced"
        );

        let context: Vec<String> = human.context().map(str::to_string).collect();
        let resonant_words = apply_contextual_weighting(
            rank(&input_signature, &self.vocabulary, self.config.encoder.resonant_words),
            &context,
            self.config.encoder.context_boost,
        );

        let generator = generators::generator_name(&intent);
        let reply = {
            let ontology: &dyn Ontology = self.ontology.as_ref();
            let mut focus_words: Vec<String> = resonant_words
                .iter()
                .filter(|r| ontology.infer_type(&r.word).is_some())
                .map(|r| r.word.clone())
                .collect();
            for value in entities.iter().filter_map(|e| e.present_value()) {
                let value = value.to_lowercase();
                if ontology.infer_type(&value).is_some() && !focus_words.contains(&value) {
                    focus_words.insert(0, value);
                }
            }

            let core = generators::generate(
                &GeneratorContext {
                    text,
                    intent: &intent,
                    entities: &entities,
                    memory: &memory,
                    bot_name: &self.config.bot_name,
                },
                &mut self.rng,
            );
            assembler::assemble(
                &AssemblyContext {
                    text,
                    intent: &intent,
                    flow: &flow,
                    memory: &memory,
                    focus_words: &focus_words,
                    ontology,
                    style: &self.config.style,
                    bot_name: &self.config.bot_name,
                },
                core,
            )
            .text()
        };

        let (response_signature, strategy, coherence) = response_signature(
            &input_signature,
            &session.bot.state.signature,
            &self.config.response,
        );
        tracing::debug!(coherence, ?strategy, generator, "response signature");

        let bot_embedding = self.backend.encode(&reply).await.inspect_err(|e| {
            tracing::warn!(error = %e, "backend failed while encoding response");
        })?;
        let bot = session.bot.observed(&Observation {
            text: &reply,
            embedding: &bot_embedding,
            signature: &response_signature,
            emotion: None,
        });

        let response = tone::apply(
            &reply,
            Tone::from_emotion(&analysis.emotion),
            &self.config.response,
        );
        let memory = memory.with_bot_turn(&response, Intent::GeneralConversation, now);

        let outcome = TurnOutcome {
            response,
            intent,
            intent_confidence: analysis.intent.confidence,
            phase: flow.phase,
            topic: memory.current_topic().map(str::to_string),
            coherence,
            strategy,
            generator,
            resonant_words,
            input_signature,
            response_signature,
        };

        self.session = Some(Session {
            memory,
            flow,
            human,
            bot,
            last_coherence: coherence,
            started_at: session.started_at,
        });
        Ok(outcome)
    }

    pub fn debug_info(&self) -> Result<DebugInfo> {
        let session = self.session.as_ref().ok_or(ChordError::NotInitialized)?;
        Ok(DebugInfo {
            human: session.human.clone(),
            bot: session.bot.clone(),
            coherence: session.last_coherence,
            memory: session.memory.stats(),
            phase: session.flow.phase,
            momentum: session.flow.momentum,
            topic: session.memory.current_topic().map(str::to_string),
            vocabulary_size: self.vocabulary.len(),
            started_at: to_iso8601(session.started_at),
        })
    }

    /// Read access to the committed memory snapshot.
    pub fn memory(&self) -> Option<&MemoryState> {
        self.session.as_ref().map(|s| &s.memory)
    }

    pub fn flow(&self) -> Option<&FlowState> {
        self.session.as_ref().map(|s| &s.flow)
    }
}
