// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 API client for address records.

use super::{DnsProvider, DnsRecord, NewRecord};
use crate::constants::{
    ADDRESS_RECORD_TYPE, HTTP_USER_AGENT, PROVIDER_MAX_PAGES, PROVIDER_PAGE_SIZE,
    PROVIDER_TIMEOUT_SECS,
};
use crate::errors::ProviderError;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Standard Cloudflare response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

/// Client for the Cloudflare DNS records API, authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct CloudflareClient {
    client: HttpClient,
    api_base: Url,
    token: String,
}

impl CloudflareClient {
    /// Create a client for `api_base` (e.g. `https://api.cloudflare.com/client/v4`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(api_base: &str, token: &str) -> Result<Self, ProviderError> {
        let transport_error = |reason: String| ProviderError::Transport {
            url: api_base.to_string(),
            reason,
        };

        let api_base = Url::parse(api_base.trim_end_matches('/'))
            .map_err(|e| transport_error(format!("invalid API base URL: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(transport_error("API base URL cannot carry a path".to_string()));
        }

        let client = HttpClient::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .user_agent(HTTP_USER_AGENT)
            .build()
            .map_err(|e| transport_error(e.to_string()))?;

        Ok(Self {
            client,
            api_base,
            token: token.to_string(),
        })
    }

    /// Build an API URL from escaped path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::Transport {
                url: self.api_base.to_string(),
                reason: "API base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn records_url(&self, zone_id: &str) -> Result<Url, ProviderError> {
        self.endpoint(&["zones", zone_id, "dns_records"])
    }

    /// Send a request and fail on any non-2xx status.
    async fn execute(
        &self,
        method: &str,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, ProviderError> {
        debug!(method = %method, url = %url, "DNS provider API request");

        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                method = %method,
                url = %url,
                status = %status,
                error = %body,
                "DNS provider API request failed"
            );
            return Err(ProviderError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        url: &Url,
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ProviderError> {
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !envelope.success {
            let reason = if envelope.errors.is_empty() {
                "success flag not set".to_string()
            } else {
                envelope
                    .errors
                    .iter()
                    .map(|m| format!("{} ({})", m.message, m.code))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(ProviderError::InvalidResponse {
                url: url.to_string(),
                reason,
            });
        }

        Ok(envelope)
    }
}

#[async_trait::async_trait]
impl DnsProvider for CloudflareClient {
    async fn list_records(
        &self,
        zone_id: &str,
        hostname: &str,
    ) -> Result<Vec<DnsRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let mut url = self.records_url(zone_id)?;
            url.query_pairs_mut()
                .append_pair("type", ADDRESS_RECORD_TYPE)
                .append_pair("name", hostname)
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &PROVIDER_PAGE_SIZE.to_string());

            let response = self.execute("GET", &url, self.client.get(url.clone())).await?;
            let envelope: Envelope<Vec<DnsRecord>> = Self::decode(&url, response).await?;

            records.extend(envelope.result.unwrap_or_default());

            let total_pages = envelope.result_info.map_or(1, |info| info.total_pages);
            if total_pages > PROVIDER_MAX_PAGES {
                // Never hand back a partial listing
                return Err(ProviderError::InvalidResponse {
                    url: url.to_string(),
                    reason: format!(
                        "listing spans {total_pages} pages, limit is {PROVIDER_MAX_PAGES}"
                    ),
                });
            }
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        debug!(
            zone_id = %zone_id,
            hostname = %hostname,
            count = records.len(),
            "Fetched address records"
        );
        Ok(records)
    }

    async fn create_record(&self, zone_id: &str, record: &NewRecord) -> Result<(), ProviderError> {
        let url = self.records_url(zone_id)?;
        self.execute("POST", &url, self.client.post(url.clone()).json(record))
            .await?;
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(&["zones", zone_id, "dns_records", record_id])?;
        self.execute("DELETE", &url, self.client.delete(url.clone()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
