use crate::config::ScrapeConfig;
use crate::error::FetchError;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::RenderOptions;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Error payload returned by ScrapingAnt on failed requests
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: serde_json::Value,
}

/// Fetches pages through the ScrapingAnt rendering proxy
pub struct ScrapingAntFetcher {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ScrapingAntFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for ScrapingAntFetcher {
    async fn fetch(&self, url: &str, options: &RenderOptions) -> Result<String, FetchError> {
        debug!(url, "Fetching through rendering API");

        let mut query: Vec<(&str, &str)> = vec![
            ("url", url),
            ("x-api-key", self.api_key.as_str()),
            ("browser", if options.browser { "true" } else { "false" }),
        ];
        if let Some(selector) = options.wait_for_selector.as_deref() {
            query.push(("wait_for_selector", selector));
        }

        let response = self.client.get(&self.api_url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        debug!(url, bytes = body.len(), "Downloaded page");
        Ok(body)
    }
}

fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            detail: serde_json::Value::String(text),
        }) => text,
        Ok(ApiErrorBody { detail }) => detail.to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ScrapeConfig {
        let mut config = ScrapeConfig::new("secret");
        config.api_url = format!("{}/v2/general", server.uri());
        config
    }

    #[tokio::test]
    async fn forwards_target_and_render_options() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/general"))
            .and(query_param("url", "https://huispedia.nl/koopwoningen/delft"))
            .and(query_param("x-api-key", "secret"))
            .and(query_param("browser", "true"))
            .and(query_param("wait_for_selector", "article"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ScrapingAntFetcher::new(&config_for(&server)).unwrap();
        let html = fetcher
            .fetch(
                "https://huispedia.nl/koopwoningen/delft",
                &RenderOptions::browser_waiting_for("article"),
            )
            .await
            .expect("fetch ok");
        assert_eq!(html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn non_success_status_carries_api_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"detail":"Invalid API key"}"#),
            )
            .mount(&server)
            .await;

        let fetcher = ScrapingAntFetcher::new(&config_for(&server)).unwrap();
        let err = fetcher
            .fetch("https://huispedia.nl/x", &RenderOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 403,
                detail: "Invalid API key".into()
            }
        );
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.request_timeout = Duration::from_millis(100);
        let fetcher = ScrapingAntFetcher::new(&config).unwrap();
        let err = fetcher
            .fetch("https://huispedia.nl/x", &RenderOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Timeout);
    }

    #[test]
    fn plain_error_bodies_are_truncated() {
        let body = "x".repeat(500);
        assert_eq!(error_detail(&body).len(), 200);
    }
}
