//! WolfyBot: a Slack bot that classifies messages with Wit.ai and answers
//! questions through Wolfram|Alpha short answers.

pub mod agent;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod health;
pub mod knowledge;
pub mod nlu;
pub mod util;

pub use config::Config;
