use super::traits::{Channel, ChannelMessage};
use anyhow::Context;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

/// Slack channel — receives events over the RTM websocket, replies via Web API
pub struct SlackChannel {
    bot_token: String,
    api_base_url: String,
    ping_interval: Duration,
    client: reqwest::Client,
}

/// Envelope shared by every Slack Web API response.
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RtmConnectResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "self", default)]
    bot: Option<RtmSelf>,
}

#[derive(Debug, Deserialize)]
struct RtmSelf {
    id: String,
    #[serde(default)]
    name: String,
}

/// Where to open the websocket and who the bot is on the other end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmSession {
    pub url: String,
    pub self_id: Option<String>,
}

/// One decoded RTM frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtmEvent {
    Hello,
    /// Server is about to close the socket; reconnect.
    Goodbye,
    Pong,
    Error(String),
    Message(ChannelMessage),
    Ignored,
}

/// Decode an RTM text frame.
///
/// Only plain human messages become [`RtmEvent::Message`]: anything with a
/// `bot_id`, anything written by the bot's own user, and edits/deletions
/// (which carry no top-level `user`/`text`) are ignored.
pub fn parse_rtm_event(text: &str, self_id: Option<&str>) -> RtmEvent {
    let event: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Slack: unparseable RTM frame: {e}");
            return RtmEvent::Ignored;
        }
    };

    let str_field = |name: &str| event.get(name).and_then(Value::as_str).unwrap_or("");

    match str_field("type") {
        "hello" => RtmEvent::Hello,
        "goodbye" => RtmEvent::Goodbye,
        "pong" => RtmEvent::Pong,
        "error" => {
            let msg = event
                .get("error")
                .and_then(|e| e.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("unknown RTM error");
            RtmEvent::Error(msg.to_string())
        }
        "message" => {
            if !str_field("bot_id").is_empty() {
                return RtmEvent::Ignored;
            }
            let user = str_field("user");
            let content = str_field("text");
            if user.is_empty() || content.trim().is_empty() {
                return RtmEvent::Ignored;
            }
            if self_id == Some(user) {
                return RtmEvent::Ignored;
            }

            let ts = str_field("ts");
            let id = if ts.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                ts.to_string()
            };
            let timestamp = ts
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && *t >= 0.0)
                .map(|t| t as u64)
                .unwrap_or_else(unix_now);

            RtmEvent::Message(ChannelMessage {
                id,
                sender: user.to_string(),
                content: content.to_string(),
                channel: "slack".to_string(),
                conversation: str_field("channel").to_string(),
                timestamp,
            })
        }
        _ => RtmEvent::Ignored,
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl SlackChannel {
    pub fn new(bot_token: String, api_base_url: &str, ping_interval: Duration) -> Self {
        Self {
            bot_token,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            ping_interval: ping_interval.max(Duration::from_secs(1)),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base_url)
    }

    /// Ask Slack for a fresh RTM websocket URL.
    pub async fn rtm_connect(&self) -> anyhow::Result<RtmSession> {
        let resp = self
            .client
            .post(self.api_url("rtm.connect"))
            .bearer_auth(&self.bot_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(crate::util::api_error("Slack", resp).await);
        }

        let data: RtmConnectResponse = resp.json().await?;
        if !data.ok {
            anyhow::bail!(
                "Slack rtm.connect failed: {}",
                data.error.as_deref().unwrap_or("unknown error")
            );
        }

        let url = data
            .url
            .ok_or_else(|| anyhow::anyhow!("Slack rtm.connect returned no websocket url"))?;
        if let Some(ref bot) = data.bot {
            tracing::info!("Slack: connected as {} ({})", bot.name, bot.id);
        }

        Ok(RtmSession {
            url,
            self_id: data.bot.map(|b| b.id),
        })
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, message: &str, recipient: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "channel": recipient,
            "text": message,
            "as_user": true
        });

        let resp = self
            .client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(crate::util::api_error("Slack", resp).await);
        }

        let data: SlackApiResponse = resp.json().await?;
        if !data.ok {
            anyhow::bail!(
                "Slack chat.postMessage failed: {}",
                data.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }

    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let session = self.rtm_connect().await?;
        let (ws, _) = connect_async(session.url.as_str())
            .await
            .context("Failed to open Slack RTM websocket")?;
        let (mut write, mut read) = ws.split();

        tracing::info!("Slack channel listening for messages...");

        let mut ping = tokio::time::interval(self.ping_interval);
        ping.tick().await;
        let mut next_ping_id: u64 = 1;

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    let frame = serde_json::json!({"id": next_ping_id, "type": "ping"});
                    next_ping_id += 1;
                    write
                        .send(Message::Text(frame.to_string()))
                        .await
                        .context("Slack RTM ping failed")?;
                }
                frame = read.next() => {
                    let Some(frame) = frame else {
                        anyhow::bail!("Slack RTM stream ended");
                    };
                    match frame.context("Slack RTM read failed")? {
                        Message::Text(text) => {
                            match parse_rtm_event(&text, session.self_id.as_deref()) {
                                RtmEvent::Hello => tracing::info!("Slack RTM: hello received"),
                                RtmEvent::Goodbye => {
                                    tracing::info!("Slack RTM: server said goodbye");
                                    return Ok(());
                                }
                                RtmEvent::Error(e) => anyhow::bail!("Slack RTM error: {e}"),
                                RtmEvent::Message(msg) => {
                                    if tx.send(msg).await.is_err() {
                                        return Ok(());
                                    }
                                }
                                RtmEvent::Pong | RtmEvent::Ignored => {}
                            }
                        }
                        Message::Close(frame) => {
                            anyhow::bail!("Slack RTM websocket closed: {frame:?}");
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    async fn health_check(&self) -> bool {
        let resp = match self
            .client
            .post(self.api_url("auth.test"))
            .bearer_auth(&self.bot_token)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Slack health check failed: {e}");
                return false;
            }
        };

        match resp.json::<SlackApiResponse>().await {
            Ok(data) => {
                if !data.ok {
                    tracing::debug!(
                        "Slack auth.test rejected token: {}",
                        data.error.as_deref().unwrap_or("unknown error")
                    );
                }
                data.ok
            }
            Err(e) => {
                tracing::debug!("Slack health check parse error: {e}");
                false
            }
        }
    }
}
