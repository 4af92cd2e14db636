//! Inference backend over HTTP: each call POSTs `{"text": ...}` JSON to
//! `{base}/encode`, `/intent`, `/entities` or `/emotion`.

use chord_core::{
    BackendError, EmotionReading, EntitySpan, InferenceBackend, IntentPrediction, LexicalBackend,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &str, text: &str) -> Result<T, BackendError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&TextRequest { text })
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("{url}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Unavailable(format!(
                "{url} returned HTTP {status}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("{url}: {e}")))
    }
}

impl InferenceBackend for HttpBackend {
    async fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError> {
        self.post("encode", text).await
    }

    async fn classify_intent(&self, text: &str) -> Result<IntentPrediction, BackendError> {
        self.post("intent", text).await
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<EntitySpan>, BackendError> {
        self.post("entities", text).await
    }

    async fn analyze_emotion(&self, text: &str) -> Result<EmotionReading, BackendError> {
        self.post("emotion", text).await
    }
}

/// Backend picked at startup from `--backend`.
pub enum AnyBackend {
    Lexical(LexicalBackend),
    Http(HttpBackend),
}

impl InferenceBackend for AnyBackend {
    async fn encode(&self, text: &str) -> Result<Vec<f64>, BackendError> {
        match self {
            AnyBackend::Lexical(b) => b.encode(text).await,
            AnyBackend::Http(b) => b.encode(text).await,
        }
    }

    async fn classify_intent(&self, text: &str) -> Result<IntentPrediction, BackendError> {
        match self {
            AnyBackend::Lexical(b) => b.classify_intent(text).await,
            AnyBackend::Http(b) => b.classify_intent(text).await,
        }
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<EntitySpan>, BackendError> {
        match self {
            AnyBackend::Lexical(b) => b.extract_entities(text).await,
            AnyBackend::Http(b) => b.extract_entities(text).await,
        }
    }

    async fn analyze_emotion(&self, text: &str) -> Result<EmotionReading, BackendError> {
        match self {
            AnyBackend::Lexical(b) => b.analyze_emotion(text).await,
            AnyBackend::Http(b) => b.analyze_emotion(text).await,
        }
    }
}
