//! Tiered LLM client with JSON-schema constrained outputs.
//!
//! All model calls flow through the [`LanguageModel`] trait so stages can be
//! tested against scripted fakes. [`LlmClient`] is the HTTP implementation
//! against an OpenAI-compatible chat-completions endpoint; it owns the
//! process-wide concurrency semaphore and the minimum inter-request delay.
//! Typed completion (schema derivation, validation, schema-retry) lives in
//! the free [`complete`] function on top of the trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use gsatvocab_config::LlmConfig;

/// Model tier selecting the underlying model per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Simple high-volume batches.
    Fast,
    /// Moderate reasoning (sense clustering).
    Balanced,
    /// Complex content (pattern teaching explanations).
    Smart,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("rate limited by upstream")]
    RateLimited,
    #[error("response did not match the requested schema: {0}")]
    Schema(String),
    #[error("llm transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("llm call failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: String,
    /// JSON schema the response must conform to (enforced server-side).
    pub schema: Value,
    pub temperature: f32,
    pub tier: ModelTier,
}

/// The two operations the pipeline consumes from a language model provider.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// One schema-constrained completion, returned as raw JSON. Transport
    /// and rate-limit retries happen inside the implementation.
    async fn complete_value(&self, request: CompletionRequest) -> Result<Value, LlmError>;

    /// One unit-length embedding vector per input text.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

pub type LlmHandle = Arc<dyn LanguageModel>;

/// Typed completion: derives the schema for `T`, calls the model, validates,
/// and retries schema mismatches twice before giving up.
pub async fn complete<T>(
    llm: &dyn LanguageModel,
    prompt: &str,
    system: &str,
    tier: ModelTier,
    temperature: f32,
) -> Result<T, LlmError>
where
    T: DeserializeOwned + JsonSchema,
{
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|e| LlmError::Schema(e.to_string()))?;
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("title");
        obj.remove("description");
        obj.remove("$schema");
    }
    tighten_schema(&mut schema);

    const SCHEMA_RETRIES: usize = 2;
    let mut last_err = None;
    for attempt in 0..=SCHEMA_RETRIES {
        let value = llm
            .complete_value(CompletionRequest {
                prompt: prompt.to_string(),
                system: system.to_string(),
                schema: schema.clone(),
                temperature,
                tier,
            })
            .await?;
        match serde_json::from_value::<T>(value) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    error = %e,
                    "schema validation failed on LLM response"
                );
                last_err = Some(LlmError::Schema(e.to_string()));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| LlmError::Other("schema retry exhausted".into())))
}

/// Make every object strict: `additionalProperties: false` and all declared
/// properties required, recursively. Endpoints enforcing strict schemas
/// reject anything less.
pub fn tighten_schema(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };

    if obj.get("type").and_then(Value::as_str) == Some("object") {
        obj.insert("additionalProperties".to_string(), json!(false));
        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            let keys: Vec<Value> = props.keys().map(|k| json!(k)).collect();
            obj.insert("required".to_string(), Value::Array(keys));
        }
    }

    for key in ["properties", "$defs", "definitions"] {
        if let Some(map) = obj.get_mut(key).and_then(Value::as_object_mut) {
            for value in map.values_mut() {
                tighten_schema(value);
            }
        }
    }
    if let Some(items) = obj.get_mut("items") {
        tighten_schema(items);
    }
    for key in ["anyOf", "allOf", "oneOf"] {
        if let Some(list) = obj.get_mut(key).and_then(Value::as_array_mut) {
            for value in list.iter_mut() {
                tighten_schema(value);
            }
        }
    }
}

fn normalize_unit(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

const MAX_RETRIES: usize = 5;
const EMBED_BATCH_SIZE: usize = 300;
const EMBED_RETRIES: usize = 3;

/// HTTP client for an OpenAI-compatible endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
    semaphore: Semaphore,
    /// Start time of the most recent request, guarded separately from the
    /// semaphore so the delay applies across all permits.
    last_request: Mutex<Option<Instant>>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        let semaphore = Semaphore::new(config.concurrency.max(1));
        Self {
            http: reqwest::Client::new(),
            config,
            semaphore,
            last_request: Mutex::new(None),
        }
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.config.model_fast,
            ModelTier::Balanced => &self.config.model_balanced,
            ModelTier::Smart => &self.config.model_smart,
        }
    }

    async fn wait_for_delay(&self) {
        let delay = Duration::from_secs_f64(self.config.request_delay.max(0.0));
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn post_chat(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = json!({
            "model": self.model_for(request.tier),
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": request.temperature,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "output",
                    "strict": true,
                    "schema": request.schema,
                },
            },
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(LlmError::Other(format!("HTTP {status}: {body}")));
        }

        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::Other(format!("response missing content: {body}")))?;
        if content.is_empty() {
            return Err(LlmError::Other("empty response from LLM".into()));
        }
        serde_json::from_str(content).map_err(|e| LlmError::Schema(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete_value(&self, request: CompletionRequest) -> Result<Value, LlmError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| LlmError::Other("semaphore closed".into()))?;
        self.wait_for_delay().await;

        let mut last_err = LlmError::Other("no attempts made".into());
        for attempt in 0..MAX_RETRIES {
            match self.post_chat(&request).await {
                Ok(value) => return Ok(value),
                Err(LlmError::RateLimited) => {
                    let wait = Duration::from_secs(10 * (attempt as u64 + 1));
                    tracing::warn!(
                        wait_secs = wait.as_secs(),
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        "rate limit hit, backing off"
                    );
                    last_err = LlmError::RateLimited;
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt = attempt + 1, "LLM call failed");
                    if attempt + 1 == MAX_RETRIES {
                        return Err(e);
                    }
                    last_err = e;
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
        Err(last_err)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let mut results: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| LlmError::Other("semaphore closed".into()))?;
            self.wait_for_delay().await;

            let mut attempt = 0;
            loop {
                let payload = json!({
                    "model": self.config.embedding_model,
                    "input": batch,
                });
                let outcome: Result<Vec<Vec<f32>>, LlmError> = async {
                    let response = self
                        .http
                        .post(&url)
                        .bearer_auth(&self.config.api_key)
                        .json(&payload)
                        .send()
                        .await?;
                    let status = response.status();
                    if status.as_u16() == 429 {
                        return Err(LlmError::RateLimited);
                    }
                    let body: Value = response.json().await?;
                    if !status.is_success() {
                        return Err(LlmError::Other(format!("HTTP {status}: {body}")));
                    }
                    let data = body
                        .get("data")
                        .and_then(Value::as_array)
                        .ok_or_else(|| LlmError::Other("embedding response missing data".into()))?;
                    let mut vectors = Vec::with_capacity(data.len());
                    for item in data {
                        let embedding: Vec<f32> = item
                            .get("embedding")
                            .and_then(Value::as_array)
                            .map(|a| {
                                a.iter()
                                    .filter_map(Value::as_f64)
                                    .map(|v| v as f32)
                                    .collect()
                            })
                            .ok_or_else(|| {
                                LlmError::Other("embedding item missing vector".into())
                            })?;
                        vectors.push(embedding);
                    }
                    Ok(vectors)
                }
                .await;

                match outcome {
                    Ok(mut vectors) => {
                        for v in &mut vectors {
                            normalize_unit(v);
                        }
                        results.extend(vectors);
                        break;
                    }
                    Err(LlmError::RateLimited) if attempt + 1 < EMBED_RETRIES => {
                        let wait = Duration::from_secs(10 * (attempt as u64 + 1));
                        tracing::warn!(wait_secs = wait.as_secs(), "embedding rate limit, waiting");
                        tokio::time::sleep(wait).await;
                    }
                    Err(e) if attempt + 1 < EMBED_RETRIES => {
                        let wait = Duration::from_secs(2 * (attempt as u64 + 1));
                        tracing::warn!(error = %e, wait_secs = wait.as_secs(), "embedding failed, retrying");
                        tokio::time::sleep(wait).await;
                    }
                    Err(e) => return Err(e),
                }
                attempt += 1;
            }
        }

        Ok(results)
    }
}
