//! Per-speaker model: a slowly drifting identity and the state of the
//! current exchange.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use uuid::Uuid;

use crate::backend::EmotionReading;
use crate::constants::{IDENTITY_RETENTION, USER_CONTEXT_CAP};
use crate::signature::PrimeSignature;

#[derive(Clone, Debug, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub display_name: String,
    pub embedding: Vec<f64>,
    pub signature: PrimeSignature,
    /// Running emotional traits (`valence`, `arousal`).
    pub traits: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversationState {
    pub embedding: Vec<f64>,
    pub signature: PrimeSignature,
    /// Most recent texts, oldest first.
    pub context: VecDeque<String>,
    pub turn_count: u64,
}

/// What one turn tells the model about its speaker.
#[derive(Clone, Debug)]
pub struct Observation<'a> {
    pub text: &'a str,
    pub embedding: &'a [f64],
    pub signature: &'a PrimeSignature,
    pub emotion: Option<&'a EmotionReading>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserModel {
    pub identity: Identity,
    pub state: ConversationState,
}

fn blend_vectors(old: &[f64], new: &[f64], retention: f64) -> Vec<f64> {
    if old.len() != new.len() {
        return new.to_vec();
    }
    old.iter()
        .zip(new)
        .map(|(o, n)| o * retention + n * (1.0 - retention))
        .collect()
}

impl UserModel {
    pub fn new(display_name: &str) -> Self {
        Self {
            identity: Identity {
                id: Uuid::new_v4(),
                display_name: display_name.to_string(),
                embedding: Vec::new(),
                signature: PrimeSignature::new(),
                traits: BTreeMap::new(),
            },
            state: ConversationState::default(),
        }
    }

    /// Overwrite the conversation state with this turn and drift the
    /// identity toward it. The first observation seeds the identity.
    pub fn observed(&self, obs: &Observation) -> Self {
        let mut next = self.clone();

        next.state.embedding = obs.embedding.to_vec();
        next.state.signature = obs.signature.clone();
        next.state.context.push_back(obs.text.to_string());
        while next.state.context.len() > USER_CONTEXT_CAP {
            next.state.context.pop_front();
        }
        next.state.turn_count += 1;

        let identity = &mut next.identity;
        if identity.embedding.is_empty() {
            identity.embedding = obs.embedding.to_vec();
        } else {
            identity.embedding =
                blend_vectors(&identity.embedding, obs.embedding, IDENTITY_RETENTION);
        }
        identity.signature = if identity.signature.is_empty() {
            obs.signature.clone()
        } else {
            identity.signature.blend(obs.signature, IDENTITY_RETENTION)
        };

        if let Some(emotion) = obs.emotion {
            for (name, value) in [("valence", emotion.valence), ("arousal", emotion.arousal)] {
                identity
                    .traits
                    .entry(name.to_string())
                    .and_modify(|t| *t = *t * IDENTITY_RETENTION + value * (1.0 - IDENTITY_RETENTION))
                    .or_insert(value);
            }
        }
        next
    }

    pub fn context(&self) -> impl Iterator<Item = &str> {
        self.state.context.iter().map(String::as_str)
    }
}
