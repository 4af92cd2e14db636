//! Inference backend boundary: text → embedding, intent, entities, emotion.
//!
//! The engine treats every backend failure as fatal for the current turn.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::turn::{EntityMention, Intent};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub label: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f64,
    /// Byte offsets into the analysed text.
    pub span: (usize, usize),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    pub label: String,
    /// -1 (negative) ..= 1 (positive)
    pub valence: f64,
    /// 0 (calm) ..= 1 (excited)
    pub arousal: f64,
    pub confidence: f64,
}

impl EmotionReading {
    pub fn neutral() -> Self {
        Self {
            label: "neutral".to_string(),
            valence: 0.0,
            arousal: 0.3,
            confidence: 0.5,
        }
    }
}

pub trait InferenceBackend: Send + Sync {
    fn encode(&self, text: &str) -> impl Future<Output = Result<Vec<f64>, BackendError>> + Send;

    fn classify_intent(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<IntentPrediction, BackendError>> + Send;

    fn extract_entities(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<EntitySpan>, BackendError>> + Send;

    fn analyze_emotion(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<EmotionReading, BackendError>> + Send;
}

/// Everything the backend says about one text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub embedding: Vec<f64>,
    pub intent: IntentPrediction,
    pub entities: Vec<EntitySpan>,
    pub emotion: EmotionReading,
}

impl Analysis {
    pub fn intent(&self) -> Intent {
        Intent::from_label(&self.intent.label)
    }

    /// Entities as positional mentions `entity_0`, `entity_1`, ... typed
    /// with the backend's entity type.
    pub fn entity_mentions(&self) -> Vec<EntityMention> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| EntityMention::typed(&format!("entity_{i}"), &e.text, &e.entity_type))
            .collect()
    }
}

/// Run the four backend calls in sequence.
pub async fn analyze<B: InferenceBackend>(
    backend: &B,
    text: &str,
) -> Result<Analysis, BackendError> {
    let embedding = backend.encode(text).await?;
    let intent = backend.classify_intent(text).await?;
    let entities = backend.extract_entities(text).await?;
    let emotion = backend.analyze_emotion(text).await?;
    Ok(Analysis {
        embedding,
        intent,
        entities,
        emotion,
    })
}
