// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests: browser-like headers, a hard timeout
//! per request, and an HTTP/1.1 retry when a server breaks HTTP/2.

use kurs_core::{KursError, KursResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// User agent sent with every plain fetch.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/131.0.0.0 Safari/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const LANGUAGES: &str = "ru-RU,ru;q=0.9,uz;q=0.8,en;q=0.7";

/// HTTP client for static sources, the channel feed and the reference rate.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for sites that reject HTTP/2.
    h1_client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client whose requests are aborted after `timeout`.
    pub fn new(timeout: Duration) -> KursResult<Self> {
        let client = builder(timeout)
            .build()
            .map_err(|e| KursError::Config(format!("http client: {e}")))?;
        let h1_client = builder(timeout)
            .http1_only()
            .build()
            .map_err(|e| KursError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            h1_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and return the body text.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    pub async fn get_text(&self, url: &str) -> KursResult<String> {
        match self.get_inner(&self.client, url).await {
            Err(Failure::Protocol(e)) => {
                debug!(url, error = %e, "retrying over HTTP/1.1");
                self.get_inner(&self.h1_client, url)
                    .await
                    .map_err(|f| f.into_error(self.timeout))
            }
            other => other.map_err(|f| f.into_error(self.timeout)),
        }
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> KursResult<T> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_inner(&self, client: &reqwest::Client, url: &str) -> Result<String, Failure> {
        let resp = client.get(url).send().await.map_err(Failure::from)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Failure::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.text().await.map_err(Failure::from)
    }
}

fn builder(timeout: Duration) -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(LANGUAGES));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        .default_headers(headers)
}

enum Failure {
    Timeout,
    Protocol(reqwest::Error),
    Status { status: u16, url: String },
    Other(reqwest::Error),
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        let msg = format!("{e:?}").to_ascii_lowercase();
        if msg.contains("http2") || msg.contains("protocol") || msg.contains("connection closed") {
            Self::Protocol(e)
        } else {
            Self::Other(e)
        }
    }
}

impl Failure {
    fn into_error(self, timeout: Duration) -> KursError {
        match self {
            Self::Timeout => KursError::Timeout(timeout),
            Self::Status { status, url } => KursError::HttpStatus { status, url },
            Self::Protocol(e) | Self::Other(e) => KursError::Network(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_text_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rates"))
            .and(header("accept-language", LANGUAGES))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let body = client
            .get_text(&format!("{}/rates", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<p>ok</p>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let err = client.get_text(&server.uri()).await.unwrap_err();
        assert!(matches!(err, KursError::HttpStatus { status: 503, .. }), "{err}");
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_millis(200)).unwrap();
        let err = client.get_text(&server.uri()).await.unwrap_err();
        assert!(matches!(err, KursError::Timeout(_)), "{err}");
    }

    #[tokio::test]
    async fn test_get_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"Rate":"12236.13"}]"#))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let v: serde_json::Value = client.get_json(&server.uri()).await.unwrap();
        assert_eq!(v[0]["Rate"], "12236.13");
    }
}
