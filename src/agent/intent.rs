//! Pick the reply branch for a message from its NLU candidates.
//!
//! The winning candidate must beat the confidence threshold **and** every
//! earlier qualifying candidate. Comparison is strict, so on a tie the
//! first-seen candidate stays selected.

use crate::nlu::EntityCandidate;

pub use crate::config::DEFAULT_CONFIDENCE_THRESHOLD as CONFIDENCE_THRESHOLD;

/// Entity name the NLU app uses for salutations.
pub const GREETINGS_ENTITY: &str = "greetings";
/// Entity name whose value is forwarded to the knowledge base.
pub const SEARCH_QUERY_ENTITY: &str = "wolfram_search_query";

/// Linear scan for the most confident candidate above `threshold`.
pub fn select_entity(candidates: &[EntityCandidate], threshold: f64) -> Option<&EntityCandidate> {
    let mut best: Option<&EntityCandidate> = None;
    for candidate in candidates {
        let best_confidence = best.map_or(0.0, |b| b.confidence);
        if candidate.confidence > threshold && candidate.confidence > best_confidence {
            best = Some(candidate);
        }
    }
    best
}

/// What the bot decided to do with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    KnowledgeQuery(String),
    Unclear,
}

impl Intent {
    pub fn classify(selected: Option<&EntityCandidate>) -> Self {
        let Some(entity) = selected else {
            return Self::Unclear;
        };

        match entity.key.as_str() {
            GREETINGS_ENTITY => Self::Greeting,
            SEARCH_QUERY_ENTITY => match entity.value_str() {
                Some(query) if !query.trim().is_empty() => {
                    Self::KnowledgeQuery(query.to_string())
                }
                _ => {
                    tracing::warn!(
                        "Search query entity has no usable text value: {}",
                        entity.value
                    );
                    Self::Unclear
                }
            },
            _ => Self::Unclear,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::KnowledgeQuery(_) => "knowledge_query",
            Self::Unclear => "unclear",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn c(key: &str, value: &str, confidence: f64) -> EntityCandidate {
        EntityCandidate::new(key, json!(value), confidence)
    }

    #[test]
    fn picks_highest_confidence_above_threshold() {
        let cands = vec![
            c("greetings", "true", 0.6),
            c(SEARCH_QUERY_ENTITY, "pi", 0.93),
            c("other", "x", 0.7),
        ];
        let best = select_entity(&cands, CONFIDENCE_THRESHOLD).unwrap();
        assert_eq!(best.key, SEARCH_QUERY_ENTITY);
    }

    #[test]
    fn threshold_is_exclusive() {
        let cands = vec![c("greetings", "true", 0.5)];
        assert!(select_entity(&cands, CONFIDENCE_THRESHOLD).is_none());

        let cands = vec![c("greetings", "true", 0.500_001)];
        assert!(select_entity(&cands, CONFIDENCE_THRESHOLD).is_some());
    }

    #[test]
    fn ties_keep_first_seen() {
        let cands = vec![
            c("greetings", "true", 0.8),
            c(SEARCH_QUERY_ENTITY, "pi", 0.8),
        ];
        let best = select_entity(&cands, CONFIDENCE_THRESHOLD).unwrap();
        assert_eq!(best.key, "greetings");
    }

    #[test]
    fn later_lower_candidate_does_not_replace_best() {
        let cands = vec![
            c(SEARCH_QUERY_ENTITY, "pi", 0.9),
            c("greetings", "true", 0.7),
        ];
        let best = select_entity(&cands, CONFIDENCE_THRESHOLD).unwrap();
        assert_eq!(best.value_str(), Some("pi"));
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select_entity(&[], CONFIDENCE_THRESHOLD).is_none());
    }

    #[test]
    fn zero_threshold_still_requires_positive_confidence() {
        let cands = vec![c("greetings", "true", 0.0)];
        assert!(select_entity(&cands, 0.0).is_none());
    }

    #[test]
    fn classify_maps_known_entities() {
        assert_eq!(Intent::classify(None), Intent::Unclear);
        assert_eq!(
            Intent::classify(Some(&c("greetings", "true", 0.9))),
            Intent::Greeting
        );
        assert_eq!(
            Intent::classify(Some(&c(SEARCH_QUERY_ENTITY, "height of everest", 0.9))),
            Intent::KnowledgeQuery("height of everest".into())
        );
        assert_eq!(
            Intent::classify(Some(&c("weather", "rain", 0.9))),
            Intent::Unclear
        );
    }

    #[test]
    fn classify_rejects_non_text_query_values() {
        let numeric = EntityCandidate::new(SEARCH_QUERY_ENTITY, json!(42), 0.9);
        assert_eq!(Intent::classify(Some(&numeric)), Intent::Unclear);

        let blank = c(SEARCH_QUERY_ENTITY, "   ", 0.9);
        assert_eq!(Intent::classify(Some(&blank)), Intent::Unclear);
    }

    #[test]
    fn query_value_is_forwarded_verbatim() {
        let padded = c(SEARCH_QUERY_ENTITY, " distance to the moon ", 0.9);
        assert_eq!(
            Intent::classify(Some(&padded)),
            Intent::KnowledgeQuery(" distance to the moon ".into())
        );
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(Intent::Greeting.label(), "greeting");
        assert_eq!(Intent::KnowledgeQuery("x".into()).label(), "knowledge_query");
        assert_eq!(Intent::Unclear.label(), "unclear");
    }
}
