use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

/// Entities at or below this confidence never select a reply branch.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing {name}: set `{section}` in the config file or the {env} env var")]
    MissingCredential {
        name: &'static str,
        section: &'static str,
        env: &'static str,
    },

    #[error("bot.confidence_threshold must be within [0, 1), got {0}")]
    InvalidThreshold(f64),

    #[error("bot.max_in_flight_messages must be at least 1")]
    ZeroInFlight,

    #[error("gateway.bind is not a socket address: {0}")]
    InvalidBind(String),
}

/// Top-level configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub wit: WitConfig,
    #[serde(default)]
    pub wolfram: WolframConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    /// Bot user OAuth token (`xoxb-...`).
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_slack_api")]
    pub api_base_url: String,
    /// Seconds between application-level RTM pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: default_slack_api(),
            ping_interval_secs: default_ping_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WitConfig {
    /// Server access token of the Wit.ai app.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_wit_api")]
    pub api_base_url: String,
    /// Value of the `v` query parameter; pins the response format.
    #[serde(default = "default_wit_version")]
    pub api_version: String,
}

impl Default for WitConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base_url: default_wit_api(),
            api_version: default_wit_version(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WolframConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default = "default_wolfram_api")]
    pub api_base_url: String,
    #[serde(default)]
    pub units: Units,
    /// Forwarded to the short-answers API as its `timeout` parameter.
    #[serde(default = "default_wolfram_timeout")]
    pub timeout_secs: u64,
}

impl Default for WolframConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_base_url: default_wolfram_api(),
            units: Units::default(),
            timeout_secs: default_wolfram_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    /// Upper bound on NLU + knowledge + reply for a single message.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight_messages: usize,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_threshold(),
            request_timeout_secs: default_request_timeout(),
            max_in_flight_messages: default_max_in_flight(),
            initial_backoff_secs: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_gateway_bind(),
        }
    }
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }
}

fn default_slack_api() -> String {
    "https://slack.com/api".into()
}
fn default_ping_interval() -> u64 {
    30
}
fn default_wit_api() -> String {
    "https://api.wit.ai".into()
}
fn default_wit_version() -> String {
    "20170307".into()
}
fn default_wolfram_api() -> String {
    "https://api.wolframalpha.com".into()
}
fn default_wolfram_timeout() -> u64 {
    1000
}
fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_request_timeout() -> u64 {
    60
}
fn default_max_in_flight() -> usize {
    16
}
fn default_initial_backoff() -> u64 {
    2
}
fn default_max_backoff() -> u64 {
    60
}
fn default_gateway_bind() -> String {
    "127.0.0.1:8787".into()
}

impl Config {
    /// Check value ranges. Credentials are optional here so that `ask` and
    /// `doctor` can run against a partial setup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.bot.confidence_threshold;
        if !(0.0..1.0).contains(&t) {
            return Err(ConfigError::InvalidThreshold(t));
        }
        if self.bot.max_in_flight_messages == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        if self.gateway.enabled {
            self.gateway.socket_addr()?;
        }
        Ok(())
    }

    /// Everything `validate` checks, plus all three service credentials.
    pub fn validate_for_run(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.slack.bot_token.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "Slack bot token",
                section: "slack.bot_token",
                env: super::ENV_SLACK_TOKEN,
            });
        }
        self.validate_for_ask()
    }

    /// Credentials needed to answer a message without Slack.
    pub fn validate_for_ask(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.wit.access_token.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "Wit.ai access token",
                section: "wit.access_token",
                env: super::ENV_WIT_TOKEN,
            });
        }
        if self.wolfram.app_id.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "Wolfram|Alpha app id",
                section: "wolfram.app_id",
                env: super::ENV_WOLFRAM_APP_ID,
            });
        }
        Ok(())
    }
}
