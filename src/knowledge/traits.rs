use async_trait::async_trait;

/// Outcome of a short-answer lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortAnswer {
    Answer(String),
    /// The engine could not interpret the query.
    NotUnderstood,
    /// The engine has a result but no short textual form of it.
    NoShortAnswer,
}

/// Computational-knowledge backend answering one-line questions.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    fn name(&self) -> &str;

    async fn short_answer(&self, query: &str) -> anyhow::Result<ShortAnswer>;

    async fn health_check(&self) -> bool {
        true
    }
}
