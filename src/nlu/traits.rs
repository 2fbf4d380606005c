use async_trait::async_trait;

/// One labeled guess extracted from a message.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCandidate {
    /// Entity name, e.g. `greetings` or `wolfram_search_query`.
    pub key: String,
    /// Resolved value; its shape depends on the entity.
    pub value: serde_json::Value,
    pub confidence: f64,
}

impl EntityCandidate {
    pub fn new(key: impl Into<String>, value: serde_json::Value, confidence: f64) -> Self {
        Self {
            key: key.into(),
            value,
            confidence,
        }
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// NLU result for a single message. Candidates keep response order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Understanding {
    pub text: String,
    pub candidates: Vec<EntityCandidate>,
}

/// Natural-language-understanding backend.
#[async_trait]
pub trait Nlu: Send + Sync {
    fn name(&self) -> &str;

    /// Extract entities from free text.
    async fn understand(&self, text: &str) -> anyhow::Result<Understanding>;

    async fn health_check(&self) -> bool {
        true
    }
}
