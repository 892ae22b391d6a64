use crate::config::{ApiKey, ConfigError, DEFAULT_CLASSIFIER_BASE_URL, DEFAULT_SENTIMENT_MODEL};
use crate::emotion::{ClassifierError, RawSentiment, SentimentClassifier};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = "emotion::huggingface";

/// Text-classification model served over the Hugging Face inference API.
#[derive(Clone)]
pub struct HuggingFaceClassifier {
    client: Client,
    api_token: Option<ApiKey>,
    endpoint: Url,
}

impl HuggingFaceClassifier {
    pub fn new(api_token: Option<ApiKey>) -> Result<Self, ConfigError> {
        let endpoint = model_endpoint(DEFAULT_CLASSIFIER_BASE_URL, DEFAULT_SENTIMENT_MODEL)?;
        Ok(Self {
            client: Client::new(),
            api_token,
            endpoint,
        })
    }

    pub fn with_model(mut self, base_url: &str, model: &str) -> Result<Self, ConfigError> {
        self.endpoint = model_endpoint(base_url, model)?;
        Ok(self)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn model_endpoint(base_url: &str, model: &str) -> Result<Url, ConfigError> {
    let model = model.trim_matches('/');
    if model.is_empty() {
        return Err(ConfigError::InvalidUrl("model name must not be empty".into()));
    }
    let mut url = Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ConfigError::InvalidUrl(format!("{base_url} cannot be a base url")))?
        .pop_if_empty()
        .push("models")
        .extend(model.split('/'));
    Ok(url)
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize, Debug)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum InferenceResponse {
    Batched(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

fn top_sentiment(response: InferenceResponse) -> Result<RawSentiment, ClassifierError> {
    let scores = match response {
        InferenceResponse::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
        InferenceResponse::Flat(scores) => scores,
        InferenceResponse::Error { error } => return Err(ClassifierError::Unavailable(error)),
    };
    scores
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|top| RawSentiment {
            label: Some(top.label),
            confidence: top.score,
        })
        .ok_or_else(|| ClassifierError::InvalidResponse("no labels in response".to_string()))
}

impl SentimentClassifier for HuggingFaceClassifier {
    fn classify_raw(&self, text: String) -> BoxFuture<'_, Result<RawSentiment, ClassifierError>> {
        async move {
            let mut request = self
                .client
                .post(self.endpoint.clone())
                .json(&InferenceRequest { inputs: &text });
            if let Some(token) = &self.api_token {
                request = request.bearer_auth(token.expose());
            }

            let response = request
                .send()
                .await
                .map_err(|e| ClassifierError::Network(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(ClassifierError::Api { status, body });
            }

            let parsed: InferenceResponse = response
                .json()
                .await
                .map_err(|e| ClassifierError::InvalidResponse(format!("Failed to parse JSON: {e}")))?;

            let sentiment = top_sentiment(parsed)?;
            tracing::debug!(
                target: LOG_TARGET,
                label = ?sentiment.label,
                confidence = sentiment.confidence,
                "classifier responded"
            );
            Ok(sentiment)
        }
        .boxed()
    }
}
