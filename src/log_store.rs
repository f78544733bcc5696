// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Append-only run log kept in a Git repository.
//!
//! Uses the repository contents API: read the current file and its blob sha,
//! append locally, write the whole file back. A concurrent writer between the
//! read and the write makes the write fail with a conflict; the next run
//! appends again.

use crate::config::LoggingSettings;
use crate::constants::{GITHUB_ACCEPT_HEADER, HTTP_USER_AGENT, PROVIDER_TIMEOUT_SECS};
use crate::errors::LogStoreError;
use crate::provider::read_token;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::ACCEPT;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// A file as currently stored in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content: String,
    /// Blob sha, required to overwrite the file
    pub sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Client for one branch of one repository.
#[derive(Debug, Clone)]
pub struct GithubLogStore {
    client: HttpClient,
    api_base: Url,
    repository: String,
    branch: String,
    token: String,
}

impl GithubLogStore {
    /// Create a store for `repository` (`owner/name`) on `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Transport`] if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(
        api_base: &str,
        repository: &str,
        branch: &str,
        token: &str,
    ) -> Result<Self, LogStoreError> {
        let transport_error = |reason: String| LogStoreError::Transport {
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
            repository: repository.to_string(),
            branch: branch.to_string(),
            token: token.to_string(),
        })
    }

    /// Create the store described by the logging settings.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::MissingRepository`] or a credential error if
    /// the settings are incomplete.
    pub fn from_settings(settings: &LoggingSettings) -> Result<Self, LogStoreError> {
        let repository = settings
            .repository
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(LogStoreError::MissingRepository)?;
        let token = read_token(&settings.token_env)?;
        Self::new(&settings.api_base, repository, &settings.branch, &token)
    }

    fn contents_url(&self, path: &str) -> Result<Url, LogStoreError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| LogStoreError::Transport {
                url: self.api_base.to_string(),
                reason: "API base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push("repos")
            .extend(self.repository.split('/'))
            .push("contents")
            .extend(path.split('/'));
        Ok(url)
    }

    fn transport(url: &Url, e: &reqwest::Error) -> LogStoreError {
        LogStoreError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }

    /// Read a file from the branch; `None` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError`] on transport failure, unexpected status or
    /// undecodable content.
    pub async fn read(&self, path: &str) -> Result<Option<StoredFile>, LogStoreError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.branch);

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_ACCEPT_HEADER)
            .send()
            .await
            .map_err(|e| Self::transport(&url, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(path = %path, "Log file does not exist yet");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LogStoreError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let invalid = |reason: String| LogStoreError::InvalidResponse {
            url: url.to_string(),
            reason,
        };
        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| invalid(e.to_string()))?;

        // The API wraps base64 content at 60 columns
        let encoded: String = contents
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| invalid(e.to_string()))?;
        let content = String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;

        Ok(Some(StoredFile {
            content,
            sha: contents.sha,
        }))
    }

    /// Append `lines` to the file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError`] if reading or writing the file fails.
    pub async fn append(
        &self,
        path: &str,
        lines: &str,
        message: &str,
    ) -> Result<(), LogStoreError> {
        let existing = self.read(path).await?;

        let (content, sha) = match &existing {
            Some(file) => (format!("{}{lines}", file.content), Some(file.sha.as_str())),
            None => (lines.to_string(), None),
        };

        let url = self.contents_url(path)?;
        let body = PutContents {
            message,
            content: BASE64.encode(content.as_bytes()),
            branch: &self.branch,
            sha,
        };

        let response = self
            .client
            .put(url.clone())
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_ACCEPT_HEADER)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LogStoreError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        info!(
            repository = %self.repository,
            branch = %self.branch,
            path = %path,
            "Logged results to {path}"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "log_store_tests.rs"]
mod log_store_tests;
