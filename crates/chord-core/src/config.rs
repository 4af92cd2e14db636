use serde::{Deserialize, Serialize};

use crate::constants::{ENCODE_THRESHOLD, HISTORY_CAP, RECENT_WINDOW};
use crate::error::{ChordError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordConfig {
    pub bot_name: String,
    pub human_name: String,
    pub encoder: EncoderConfig,
    pub memory: MemoryConfig,
    pub flow: FlowConfig,
    pub style: StyleConfig,
    pub response: ResponseConfig,
    pub ontology: OntologyConfig,
}

impl Default for ChordConfig {
    fn default() -> Self {
        Self {
            bot_name: "Chord".to_string(),
            human_name: "User".to_string(),
            encoder: EncoderConfig::default(),
            memory: MemoryConfig::default(),
            flow: FlowConfig::default(),
            style: StyleConfig::default(),
            response: ResponseConfig::default(),
            ontology: OntologyConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub threshold: f64,
    /// Words ranked per turn against the ontology vocabulary.
    pub resonant_words: usize,
    pub context_boost: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            threshold: ENCODE_THRESHOLD,
            resonant_words: 5,
            context_boost: crate::constants::CONTEXT_BOOST,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub history_cap: usize,
    pub recent_window: usize,
    /// Entities mentioned within this many seconds count as relevant.
    pub entity_window_secs: u64,
    pub initial_intent_confidence: f64,
    pub intent_boost: f64,
    pub intent_decay: f64,
    pub intent_min_confidence: f64,
    pub intent_max_idle_turns: u32,
    pub goal_cap: usize,
    /// Turns scanned for ENTITY_QUERY antecedents of a pronoun.
    pub pronoun_lookback: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            history_cap: HISTORY_CAP,
            recent_window: RECENT_WINDOW,
            entity_window_secs: 300,
            initial_intent_confidence: 0.5,
            intent_boost: 0.2,
            intent_decay: 0.1,
            intent_min_confidence: 0.3,
            intent_max_idle_turns: 5,
            goal_cap: 5,
            pronoun_lookback: 3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub deepening_depth: u32,
    pub churn_history: usize,
    pub opening_max_turns: u32,
    pub deepening_max_turns: u32,
    pub transition_max_turns: u32,
    pub momentum_decay: f64,
    pub question_momentum: f64,
    pub introduction_momentum: f64,
    pub idle_momentum_penalty: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            deepening_depth: 4,
            churn_history: 4,
            opening_max_turns: 3,
            deepening_max_turns: 8,
            transition_max_turns: 2,
            momentum_decay: 0.95,
            question_momentum: 0.2,
            introduction_momentum: 0.3,
            idle_momentum_penalty: 0.1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub high_momentum: f64,
    pub low_momentum: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            high_momentum: 0.6,
            low_momentum: 0.3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub coherence_threshold: f64,
    pub amplification: f64,
    pub understanding_primes: Vec<(u64, u64)>,
    pub knowledge_primes: Vec<(u64, u64)>,
    pub personality_primes: Vec<(u64, u64)>,
    pub harmonic_top: usize,
    pub harmonic_scale: f64,
    pub warmth_threshold: f64,
    pub enthusiasm_threshold: f64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            coherence_threshold: 0.1,
            amplification: 1.3,
            understanding_primes: vec![(2, 500), (3, 400)],
            knowledge_primes: vec![(5, 450), (7, 350)],
            personality_primes: vec![(11, 300), (13, 250), (17, 200)],
            harmonic_top: 5,
            harmonic_scale: 0.7,
            warmth_threshold: 0.7,
            enthusiasm_threshold: 0.7,
        }
    }
}

/// Extra vocabulary types layered over the built-in ontology.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    pub types: Vec<OntologyTypeConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyTypeConfig {
    pub name: String,
    pub words: Vec<String>,
    pub properties: Vec<String>,
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ChordError::ConfigurationInvalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_positive(name: &str, value: usize) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(ChordError::ConfigurationInvalid(format!("{name} must be > 0")))
    }
}

fn check_primes(name: &str, primes: &[(u64, u64)]) -> Result<()> {
    match primes.iter().find(|(p, w)| *p < 2 || *w == 0) {
        Some((p, w)) => Err(ChordError::ConfigurationInvalid(format!(
            "{name} entry ({p}, {w}) needs a key >= 2 and a weight >= 1"
        ))),
        None => Ok(()),
    }
}

impl ChordConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ChordError::ConfigurationInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject malformed tables before the engine starts.
    pub fn validate(&self) -> Result<()> {
        if self.bot_name.trim().is_empty() {
            return Err(ChordError::ConfigurationInvalid("bot_name is empty".into()));
        }
        check_unit("encoder.threshold", self.encoder.threshold)?;
        if self.encoder.context_boost < 1.0 {
            return Err(ChordError::ConfigurationInvalid(
                "encoder.context_boost must be >= 1".into(),
            ));
        }

        let m = &self.memory;
        check_positive("memory.history_cap", m.history_cap)?;
        check_positive("memory.recent_window", m.recent_window)?;
        check_positive("memory.goal_cap", m.goal_cap)?;
        check_unit("memory.initial_intent_confidence", m.initial_intent_confidence)?;
        check_unit("memory.intent_boost", m.intent_boost)?;
        check_unit("memory.intent_decay", m.intent_decay)?;
        check_unit("memory.intent_min_confidence", m.intent_min_confidence)?;

        let f = &self.flow;
        check_unit("flow.momentum_decay", f.momentum_decay)?;
        check_unit("flow.question_momentum", f.question_momentum)?;
        check_unit("flow.introduction_momentum", f.introduction_momentum)?;
        check_unit("flow.idle_momentum_penalty", f.idle_momentum_penalty)?;

        let s = &self.style;
        check_unit("style.low_momentum", s.low_momentum)?;
        check_unit("style.high_momentum", s.high_momentum)?;
        if s.low_momentum >= s.high_momentum {
            return Err(ChordError::ConfigurationInvalid(format!(
                "style.low_momentum ({}) must be below style.high_momentum ({})",
                s.low_momentum, s.high_momentum
            )));
        }

        let r = &self.response;
        check_unit("response.coherence_threshold", r.coherence_threshold)?;
        check_unit("response.harmonic_scale", r.harmonic_scale)?;
        check_unit("response.warmth_threshold", r.warmth_threshold)?;
        check_unit("response.enthusiasm_threshold", r.enthusiasm_threshold)?;
        check_primes("response.understanding_primes", &r.understanding_primes)?;
        check_primes("response.knowledge_primes", &r.knowledge_primes)?;
        check_primes("response.personality_primes", &r.personality_primes)?;

        for ty in &self.ontology.types {
            if ty.name.trim().is_empty() {
                return Err(ChordError::ConfigurationInvalid(
                    "ontology type with empty name".into(),
                ));
            }
            if ty.words.iter().all(|w| w.trim().is_empty()) {
                return Err(ChordError::ConfigurationInvalid(format!(
                    "ontology type '{}' has no words",
                    ty.name
                )));
            }
        }
        Ok(())
    }
}
