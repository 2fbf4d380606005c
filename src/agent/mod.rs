pub mod intent;
pub mod responder;

pub use intent::{select_entity, Intent, CONFIDENCE_THRESHOLD};
pub use responder::{compose_reply, respond};
