//! Free dictionary API client with a process-global throttle.
//!
//! The API is a shared free service: at most one request in flight, a
//! minimum interval between request starts with a small jitter, and a
//! cooldown that grows on 429 so every concurrent fetcher backs off
//! together.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use gsatvocab_config::DictionaryConfig;

const DICT_MAX_CONCURRENCY: usize = 1;
const DICT_BASE_INTERVAL: f64 = 0.6;
const DICT_MAX_INTERVAL: f64 = 2.5;
const DICT_MAX_WAIT_ON_429: f64 = 8.0;
const DICT_RETRIES: usize = 4;

/// One raw dictionary sense, positionally indexed for cluster references.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionarySense {
    pub idx: usize,
    pub pos: Option<String>,
    pub definition: String,
    pub example: Option<String>,
}

/// The one operation the inventory consumes from the dictionary.
#[async_trait]
pub trait DictionaryApi: Send + Sync {
    /// Raw senses for a lemma; empty when the API has no entry (404).
    async fn fetch_senses(&self, lemma: &str) -> Result<Vec<DictionarySense>>;
}

fn normalize_dict_pos(pos: Option<&str>) -> Option<String> {
    let pos = pos?;
    Some(match pos.to_lowercase().as_str() {
        "noun" => "NOUN".to_string(),
        "verb" => "VERB".to_string(),
        "adjective" => "ADJ".to_string(),
        "adverb" => "ADV".to_string(),
        "preposition" => "PREP".to_string(),
        "conjunction" => "CONJ".to_string(),
        "determiner" => "DET".to_string(),
        "interjection" => "INTJ".to_string(),
        "pronoun" => "PRON".to_string(),
        other => other.to_uppercase(),
    })
}

/// Parse the `entries[].meanings[].definitions[]` payload into a flat,
/// positionally indexed sense list.
pub(crate) fn parse_dictionary_payload(payload: &Value) -> Vec<DictionarySense> {
    let mut senses = Vec::new();
    let Some(entries) = payload.as_array() else {
        return senses;
    };
    for entry in entries {
        let Some(meanings) = entry.get("meanings").and_then(Value::as_array) else {
            continue;
        };
        for meaning in meanings {
            let pos = normalize_dict_pos(meaning.get("partOfSpeech").and_then(Value::as_str));
            let Some(definitions) = meaning.get("definitions").and_then(Value::as_array) else {
                continue;
            };
            for definition in definitions {
                let Some(text) = definition.get("definition").and_then(Value::as_str) else {
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }
                senses.push(DictionarySense {
                    idx: senses.len(),
                    pos: pos.clone(),
                    definition: text.trim().to_string(),
                    example: definition
                        .get("example")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
        }
    }
    senses
}

struct Throttle {
    next_allowed: Instant,
    interval: f64,
}

pub struct DictionaryClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Semaphore,
    throttle: Mutex<Throttle>,
}

impl DictionaryClient {
    pub fn new(config: &DictionaryConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            semaphore: Semaphore::new(DICT_MAX_CONCURRENCY),
            throttle: Mutex::new(Throttle {
                next_allowed: Instant::now(),
                interval: DICT_BASE_INTERVAL,
            }),
        })
    }

    /// Block until this request may start, advancing the shared
    /// next-allowed time by the current interval plus jitter.
    async fn wait_for_slot(&self) {
        loop {
            let wait = {
                let mut throttle = self.throttle.lock().await;
                let now = Instant::now();
                if throttle.next_allowed <= now {
                    let jitter = rand::thread_rng().gen_range(0.01..0.05);
                    throttle.next_allowed =
                        now + Duration::from_secs_f64(throttle.interval + jitter);
                    return;
                }
                throttle.next_allowed - now
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// After a 429, extend the shared cooldown so concurrent fetchers back
    /// off too, and raise the pacing interval.
    async fn extend_cooldown(&self, wait_seconds: f64) {
        let mut throttle = self.throttle.lock().await;
        let new_interval = (throttle.interval * 1.5)
            .max(wait_seconds)
            .max(DICT_BASE_INTERVAL)
            .min(DICT_MAX_INTERVAL);
        if new_interval > throttle.interval {
            throttle.interval = new_interval;
            tracing::warn!(interval = new_interval, "dictionary throttle increased");
        }
        let cooldown_until =
            Instant::now() + Duration::from_secs_f64(wait_seconds.min(DICT_MAX_WAIT_ON_429));
        if cooldown_until > throttle.next_allowed {
            throttle.next_allowed = cooldown_until;
        }
    }

    async fn current_interval(&self) -> f64 {
        self.throttle.lock().await.interval
    }
}

#[async_trait]
impl DictionaryApi for DictionaryClient {
    async fn fetch_senses(&self, lemma: &str) -> Result<Vec<DictionarySense>> {
        let url = format!("{}/{}", self.base_url, lemma);

        for attempt in 1..=DICT_RETRIES {
            let base_wait = self.current_interval().await.max(DICT_BASE_INTERVAL);

            let response = {
                let _permit = self.semaphore.acquire().await?;
                self.wait_for_slot().await;
                self.http.get(&url).send().await
            };

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(lemma, error = %e, "dictionary API request failed");
                    if attempt < DICT_RETRIES {
                        tokio::time::sleep(Duration::from_secs_f64(base_wait * attempt as f64))
                            .await;
                        continue;
                    }
                    return Ok(Vec::new());
                }
            };

            let status = response.status();
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<f64>().ok());
                let mut wait_seconds =
                    retry_after.unwrap_or(base_wait * (attempt as f64 + 1.0));
                wait_seconds = wait_seconds
                    .max(self.current_interval().await * 2.0)
                    .min(DICT_MAX_WAIT_ON_429);
                tracing::warn!(
                    lemma,
                    wait_seconds,
                    attempt,
                    max = DICT_RETRIES,
                    "dictionary API rate limited"
                );
                self.extend_cooldown(wait_seconds).await;
                tokio::time::sleep(Duration::from_secs_f64(wait_seconds)).await;
                continue;
            }

            if !status.is_success() {
                if status.as_u16() != 404 {
                    tracing::warn!(lemma, status = status.as_u16(), "dictionary API error");
                }
                return Ok(Vec::new());
            }

            let payload: Value = match response.json().await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(lemma, error = %e, "dictionary API returned invalid JSON");
                    return Ok(Vec::new());
                }
            };
            return Ok(parse_dictionary_payload(&payload));
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_meanings_into_indexed_senses() {
        let payload = json!([
            {
                "word": "commit",
                "meanings": [
                    {
                        "partOfSpeech": "verb",
                        "definitions": [
                            {"definition": "to do something illegal"},
                            {"definition": "to promise or dedicate", "example": "commit to a goal"}
                        ]
                    },
                    {
                        "partOfSpeech": "noun",
                        "definitions": [{"definition": "the act of committing"}]
                    }
                ]
            }
        ]);
        let senses = parse_dictionary_payload(&payload);
        assert_eq!(senses.len(), 3);
        assert_eq!(senses[0].idx, 0);
        assert_eq!(senses[0].pos.as_deref(), Some("VERB"));
        assert_eq!(senses[1].example.as_deref(), Some("commit to a goal"));
        assert_eq!(senses[2].pos.as_deref(), Some("NOUN"));
    }

    #[test]
    fn empty_or_malformed_payload_yields_no_senses() {
        assert!(parse_dictionary_payload(&json!({"title": "No Definitions Found"})).is_empty());
        assert!(parse_dictionary_payload(&json!([])).is_empty());
        assert!(
            parse_dictionary_payload(&json!([{"meanings": [{"definitions": [{"definition": "  "}]}]}]))
                .is_empty()
        );
    }

    #[test]
    fn dict_pos_normalization() {
        assert_eq!(normalize_dict_pos(Some("adjective")).as_deref(), Some("ADJ"));
        assert_eq!(normalize_dict_pos(Some("determiner")).as_deref(), Some("DET"));
        assert_eq!(normalize_dict_pos(None), None);
    }
}
