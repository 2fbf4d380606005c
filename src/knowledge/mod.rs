pub mod traits;
pub mod wolfram;

pub use traits::{KnowledgeBase, ShortAnswer};
pub use wolfram::WolframAlpha;

use crate::config::WolframConfig;

pub fn create_knowledge_base(config: &WolframConfig) -> Box<dyn KnowledgeBase> {
    Box::new(WolframAlpha::new(
        Some(config.app_id.as_str()),
        &config.api_base_url,
        config.units,
        config.timeout_secs,
    ))
}
