pub mod traits;
pub mod wit;

pub use traits::{EntityCandidate, Nlu, Understanding};
pub use wit::WitNlu;

use crate::config::WitConfig;

pub fn create_nlu(config: &WitConfig) -> Box<dyn Nlu> {
    Box::new(WitNlu::new(
        Some(config.access_token.as_str()),
        &config.api_base_url,
        &config.api_version,
    ))
}
