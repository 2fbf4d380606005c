use super::traits::{KnowledgeBase, ShortAnswer};
use crate::config::Units;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const NOT_UNDERSTOOD_BODY: &str = "Wolfram|Alpha did not understand your input";
const NO_SHORT_ANSWER_BODY: &str = "No short answer available";

/// Wolfram|Alpha Short Answers API (`/v1/result`).
pub struct WolframAlpha {
    app_id: Option<String>,
    base_url: String,
    units: Units,
    timeout_secs: u64,
    client: Client,
}

impl WolframAlpha {
    pub fn new(app_id: Option<&str>, base_url: &str, units: Units, timeout_secs: u64) -> Self {
        Self {
            app_id: app_id.filter(|a| !a.is_empty()).map(ToString::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
            units,
            timeout_secs,
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn result_url(&self) -> String {
        format!("{}/v1/result", self.base_url)
    }
}

/// Map a short-answers response onto [`ShortAnswer`].
///
/// The API reports both "not understood" and "no short answer" as
/// `501 Not Implemented` with a fixed body; the body is what tells them apart.
/// Returns `None` when the response is neither a known sentinel nor a success.
pub fn classify_short_answer(status: StatusCode, body: &str) -> Option<ShortAnswer> {
    let body = body.trim();
    if body == NOT_UNDERSTOOD_BODY {
        return Some(ShortAnswer::NotUnderstood);
    }
    if body == NO_SHORT_ANSWER_BODY {
        return Some(ShortAnswer::NoShortAnswer);
    }
    if status.is_success() {
        return Some(ShortAnswer::Answer(body.to_string()));
    }
    None
}

#[async_trait]
impl KnowledgeBase for WolframAlpha {
    fn name(&self) -> &str {
        "wolfram"
    }

    async fn short_answer(&self, query: &str) -> anyhow::Result<ShortAnswer> {
        let app_id = self.app_id.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Wolfram|Alpha app id not set. Set WOLFRAM_APP_ID or wolfram.app_id.")
        })?;

        let timeout = self.timeout_secs.to_string();
        let response = self
            .client
            .get(self.result_url())
            .query(&[
                ("appid", app_id.as_str()),
                ("i", query),
                ("units", self.units.as_str()),
                ("timeout", timeout.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_IMPLEMENTED {
            return Err(crate::util::api_error("Wolfram|Alpha", response).await);
        }

        let body = response.text().await?;
        classify_short_answer(status, &body).ok_or_else(|| {
            anyhow::anyhow!(
                "Wolfram|Alpha API error ({status}): {}",
                crate::util::truncate_with_ellipsis(body.trim(), 200)
            )
        })
    }

    async fn health_check(&self) -> bool {
        match self.short_answer("2+2").await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Wolfram|Alpha health check failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Router};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn fake_wolfram() -> Router {
        Router::new().route(
            "/v1/result",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let input = q.get("i").cloned().unwrap_or_default();
                match input.as_str() {
                    "asdfgh" => (StatusCode::NOT_IMPLEMENTED, NOT_UNDERSTOOD_BODY.to_string()),
                    "history of rome" => {
                        (StatusCode::NOT_IMPLEMENTED, NO_SHORT_ANSWER_BODY.to_string())
                    }
                    "" => (StatusCode::BAD_REQUEST, "No input".to_string()),
                    _ => (
                        StatusCode::OK,
                        format!(
                            "{input}|{}|{}|{}",
                            q.get("appid").cloned().unwrap_or_default(),
                            q.get("units").cloned().unwrap_or_default(),
                            q.get("timeout").cloned().unwrap_or_default()
                        ),
                    ),
                }
            }),
        )
    }

    #[test]
    fn classify_sentinels_regardless_of_status() {
        assert_eq!(
            classify_short_answer(StatusCode::NOT_IMPLEMENTED, NOT_UNDERSTOOD_BODY),
            Some(ShortAnswer::NotUnderstood)
        );
        assert_eq!(
            classify_short_answer(StatusCode::OK, "No short answer available\n"),
            Some(ShortAnswer::NoShortAnswer)
        );
        assert_eq!(
            classify_short_answer(StatusCode::OK, " 4 \n"),
            Some(ShortAnswer::Answer("4".into()))
        );
        assert_eq!(
            classify_short_answer(StatusCode::NOT_IMPLEMENTED, "something else"),
            None
        );
    }

    #[tokio::test]
    async fn short_answer_fails_without_app_id() {
        let wa = WolframAlpha::new(Some(""), "http://127.0.0.1:9", Units::Metric, 1000);
        let err = wa.short_answer("2+2").await.unwrap_err();
        assert!(err.to_string().contains("app id not set"));
    }

    #[tokio::test]
    async fn short_answer_passes_query_parameters() {
        let base = serve(fake_wolfram()).await;
        let wa = WolframAlpha::new(Some("APP-1"), &base, Units::Imperial, 1000);

        let answer = wa.short_answer("speed of light").await.unwrap();
        assert_eq!(
            answer,
            ShortAnswer::Answer("speed of light|APP-1|imperial|1000".into())
        );
    }

    #[tokio::test]
    async fn short_answer_maps_501_sentinels() {
        let base = serve(fake_wolfram()).await;
        let wa = WolframAlpha::new(Some("APP-1"), &base, Units::Metric, 1000);

        assert_eq!(
            wa.short_answer("asdfgh").await.unwrap(),
            ShortAnswer::NotUnderstood
        );
        assert_eq!(
            wa.short_answer("history of rome").await.unwrap(),
            ShortAnswer::NoShortAnswer
        );
    }

    #[tokio::test]
    async fn short_answer_surfaces_other_errors() {
        let base = serve(fake_wolfram()).await;
        let wa = WolframAlpha::new(Some("APP-1"), &base, Units::Metric, 1000);

        let err = wa.short_answer("").await.unwrap_err().to_string();
        assert!(err.contains("Wolfram|Alpha API error"));
        assert!(err.contains("400"));
    }
}
