// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! The central bank's official USD rate, read from its JSON archive.

use super::http_client::HttpClient;
use kurs_core::{KursError, KursResult};
use serde::{Deserialize, Serialize};

/// One currency entry of the archive. Figures are kept as published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRate {
    #[serde(rename = "Ccy")]
    pub currency: String,
    #[serde(rename = "Rate")]
    pub rate: String,
    #[serde(rename = "Diff", default)]
    pub diff: String,
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Nominal", default)]
    pub nominal: String,
}

/// Fetch the archive at `url` and return its USD entry.
pub async fn fetch_usd(client: &HttpClient, url: &str) -> KursResult<ReferenceRate> {
    let entries: Vec<ReferenceRate> = client.get_json(url).await?;
    entries
        .into_iter()
        .find(|e| e.currency == "USD")
        .ok_or_else(|| KursError::Validation("no USD entry in reference archive".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_usd_entry() {
        let server = MockServer::start().await;
        let body = r#"[
            {"Ccy":"EUR","Rate":"14250.10","Diff":"-3.2","Date":"16.10.2026","Nominal":"1"},
            {"Ccy":"USD","Rate":"12236.13","Diff":"12.4","Date":"16.10.2026","Nominal":"1"}
        ]"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let usd = fetch_usd(&client, &server.uri()).await.unwrap();
        assert_eq!(usd.rate, "12236.13");
        assert_eq!(usd.date, "16.10.2026");
    }

    #[tokio::test]
    async fn test_missing_usd_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        assert!(fetch_usd(&client, &server.uri()).await.is_err());
    }
}
