// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider interface.
//!
//! The reconciler talks to the provider only through [`DnsProvider`]: list the
//! address records at a hostname, create one, delete one by id. Calls are made
//! once; failures are reported to the caller and never retried.
//!
//! [`CloudflareClient`] is the production implementation.

pub mod cloudflare;

pub use cloudflare::CloudflareClient;

use crate::config::ProviderSettings;
use crate::constants::ADDRESS_RECORD_TYPE;
use crate::errors::{CredentialError, ProviderError, ProviderSetupError};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// An address record as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider record identifier, used for deletion
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Record value; an IPv4 address for `A` records
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

/// Body of a record creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: Ipv4Addr,
    pub ttl: u32,
    pub proxied: bool,
}

impl NewRecord {
    /// An `A` record for `hostname` pointing at `ip`.
    #[must_use]
    pub fn address(hostname: &str, ip: Ipv4Addr, ttl: u32, proxied: bool) -> Self {
        Self {
            record_type: ADDRESS_RECORD_TYPE.to_string(),
            name: hostname.to_string(),
            content: ip,
            ttl,
            proxied,
        }
    }
}

/// Operations the reconciler needs from a DNS provider.
#[async_trait::async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every address record named `hostname` in `zone_id`.
    async fn list_records(&self, zone_id: &str, hostname: &str)
        -> Result<Vec<DnsRecord>, ProviderError>;

    /// Create an address record in `zone_id`.
    async fn create_record(&self, zone_id: &str, record: &NewRecord) -> Result<(), ProviderError>;

    /// Delete the record `record_id` from `zone_id`.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError>;
}

/// Read a bearer token from the environment.
///
/// # Errors
///
/// Returns [`CredentialError::MissingToken`] if the variable is unset or blank,
/// and [`CredentialError::InvalidToken`] if it cannot be sent as a header.
pub fn read_token(env_var: &str) -> Result<String, CredentialError> {
    let token = std::env::var(env_var)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CredentialError::MissingToken {
            env_var: env_var.to_string(),
        })?;

    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        CredentialError::InvalidToken {
            env_var: env_var.to_string(),
        }
    })?;

    Ok(token)
}

/// Build the Cloudflare client described by `settings`.
///
/// # Errors
///
/// Returns [`ProviderSetupError`] if the token is unavailable or the client
/// cannot be built.
pub fn connect(settings: &ProviderSettings) -> Result<CloudflareClient, ProviderSetupError> {
    let token = read_token(&settings.token_env)?;
    Ok(CloudflareClient::new(&settings.api_base, &token)?)
}
