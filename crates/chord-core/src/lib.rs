//! Prime-signature dialogue engine.
//!
//! Each utterance is embedded by an inference backend and factored into a
//! sparse prime signature. A turn then flows through three stages:
//! memory (history, entities, intents, topic, goals), flow (phase state
//! machine, momentum, discourse markers) and the assembler (style,
//! templates, query resolution), sequenced by the [`Orchestrator`].
//!
//! Zero process or network I/O: backends are injected.

pub mod assembler;
pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod flow;
pub mod generators;
pub mod lexical;
pub mod memory;
pub mod ontology;
pub mod orchestrator;
pub mod resolver;
pub mod resonance;
pub mod signature;
pub mod templates;
pub mod time;
pub mod tokenizer;
pub mod tone;
pub mod turn;
pub mod user_model;

pub use backend::{Analysis, EmotionReading, EntitySpan, InferenceBackend, IntentPrediction, analyze};
pub use config::ChordConfig;
pub use constants::{ENCODE_THRESHOLD, EPSILON, HARMONIC_FACTOR};
pub use error::{BackendError, ChordError, Result};
pub use flow::{FlowState, Phase, ResponseType};
pub use lexical::LexicalBackend;
pub use memory::{MemoryState, MemoryStats};
pub use ontology::{Ontology, StaticOntology};
pub use orchestrator::{DebugInfo, Orchestrator, Strategy, TurnOutcome};
pub use resonance::{ResonanceResult, Vocabulary, rank};
pub use signature::{PrimeSignature, SignatureEncoder};
pub use turn::{ConversationTurn, EntityMention, Intent, Speaker, TurnInput};
pub use user_model::UserModel;
