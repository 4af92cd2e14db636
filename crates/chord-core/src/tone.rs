use serde::Serialize;

use crate::backend::EmotionReading;
use crate::config::ResponseConfig;

const EMPATHY_PREFIX: &str = "I understand.";

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Tone {
    pub warmth: f64,
    pub enthusiasm: f64,
}

impl Tone {
    /// Negative, aroused input calls for warmth; positive, aroused input
    /// for enthusiasm.
    pub fn from_emotion(emotion: &EmotionReading) -> Self {
        let valence = emotion.valence.clamp(-1.0, 1.0);
        let arousal = emotion.arousal.clamp(0.0, 1.0);
        Self {
            warmth: ((1.0 - valence) / 2.0 + 0.2 * arousal).clamp(0.0, 1.0),
            enthusiasm: (0.6 * (valence + 1.0) / 2.0 + 0.4 * arousal).clamp(0.0, 1.0),
        }
    }
}

pub fn apply(text: &str, tone: Tone, cfg: &ResponseConfig) -> String {
    let mut out = text.trim().to_string();
    if out.is_empty() {
        return out;
    }

    if tone.warmth > cfg.warmth_threshold && !out.starts_with(EMPATHY_PREFIX) {
        out = format!("{EMPATHY_PREFIX} {out}");
    }

    if tone.enthusiasm > cfg.enthusiasm_threshold && !out.ends_with(['?', '!']) {
        if out.ends_with('.') {
            out.pop();
        }
        out.push('!');
    }
    out
}
