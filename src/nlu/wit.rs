use super::traits::{EntityCandidate, Nlu, Understanding};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Wit.ai `/message` client.
pub struct WitNlu {
    access_token: Option<String>,
    base_url: String,
    api_version: String,
    client: Client,
}

impl WitNlu {
    pub fn new(access_token: Option<&str>, base_url: &str, api_version: &str) -> Self {
        Self {
            access_token: access_token
                .filter(|t| !t.is_empty())
                .map(ToString::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn message_url(&self) -> String {
        format!("{}/message", self.base_url)
    }
}

/// Flatten a `/message` response into candidates, in response order.
///
/// Handles both response generations: the legacy map of entity name to
/// values, and the newer form with `name:role` entity keys plus `traits`
/// (`wit$greetings`) and `intents`.
pub fn parse_message_response(query: &str, body: &Value) -> Understanding {
    let text = body
        .get("_text")
        .or_else(|| body.get("text"))
        .and_then(Value::as_str)
        .unwrap_or(query)
        .to_string();

    let mut candidates = Vec::new();

    for section in ["entities", "traits"] {
        let Some(map) = body.get(section).and_then(Value::as_object) else {
            continue;
        };
        for (raw_key, values) in map {
            let key = normalize_key(raw_key);
            let Some(values) = values.as_array() else {
                continue;
            };
            for entry in values {
                let Some(confidence) = entry.get("confidence").and_then(Value::as_f64) else {
                    tracing::debug!("Wit: skipping `{raw_key}` entry without confidence");
                    continue;
                };
                let value = entry.get("value").cloned().unwrap_or(Value::Null);
                candidates.push(EntityCandidate::new(key, value, confidence));
            }
        }
    }

    if let Some(intents) = body.get("intents").and_then(Value::as_array) {
        for intent in intents {
            let name = intent.get("name").and_then(Value::as_str);
            let confidence = intent.get("confidence").and_then(Value::as_f64);
            if let (Some(name), Some(confidence)) = (name, confidence) {
                candidates.push(EntityCandidate::new(name, Value::Null, confidence));
            }
        }
    }

    Understanding { text, candidates }
}

fn normalize_key(raw: &str) -> &str {
    let name = raw.split(':').next().unwrap_or(raw);
    name.strip_prefix("wit$").unwrap_or(name)
}

#[async_trait]
impl Nlu for WitNlu {
    fn name(&self) -> &str {
        "wit"
    }

    async fn understand(&self, text: &str) -> anyhow::Result<Understanding> {
        let token = self.access_token.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Wit.ai access token not set. Set WIT_AI_ACCESS_TOKEN or wit.access_token.")
        })?;

        let response = self
            .client
            .get(self.message_url())
            .bearer_auth(token)
            .query(&[("v", self.api_version.as_str()), ("q", text)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(crate::util::api_error("Wit.ai", response).await);
        }

        let body: Value = response.json().await?;
        Ok(parse_message_response(text, &body))
    }

    async fn health_check(&self) -> bool {
        match self.understand("hello").await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Wit.ai health check failed: {e}");
                false
            }
        }
    }
}
