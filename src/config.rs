// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Run configuration: servers, services and their DNS bindings.
//!
//! The configuration is a single JSON (or YAML) document loaded once per run.
//! It is read-only reference data for the health aggregator and the DNS
//! reconciler.
//!
//! # Example
//!
//! ```json
//! {
//!   "servers": [
//!     { "name": "edge-1", "ip": "203.0.113.10" },
//!     { "name": "edge-2", "ip": "203.0.113.11" }
//!   ],
//!   "services": [
//!     {
//!       "name": "app",
//!       "hostname": "app.example.com",
//!       "scheme": "https",
//!       "healthcheck_path": "/healthz",
//!       "servers": ["edge-1", "edge-2"],
//!       "cloudflare": { "zone_id": "0123abcd", "update_dns": true, "ttl": 60 }
//!     }
//!   ],
//!   "cloudflare": { "enabled": true },
//!   "logging": { "enabled": true, "repository": "acme/status" }
//! }
//! ```

use crate::constants::{
    CLOUDFLARE_API_BASE, DEFAULT_CLOUDFLARE_TOKEN_ENV, DEFAULT_DNS_RECORD_TTL_SECS,
    DEFAULT_GITHUB_TOKEN_ENV, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT, DEFAULT_LOG_BRANCH,
    GITHUB_API_BASE,
};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backing servers, keyed by unique name
    #[serde(default)]
    pub servers: Vec<Server>,

    /// Monitored services
    #[serde(default)]
    pub services: Vec<Service>,

    /// Global DNS provider settings
    #[serde(default)]
    pub cloudflare: ProviderSettings,

    /// Run log shipping settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// A backing server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Unique server name
    pub name: String,
    /// Address advertised in DNS and used as the probe target
    pub ip: Ipv4Addr,
}

/// Protocol used to reach a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    /// Port implied by the scheme when none is configured.
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => DEFAULT_HTTP_PORT,
            Self::Https => DEFAULT_HTTPS_PORT,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored service and the servers that back it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Unique service name
    pub name: String,

    /// Public hostname; also the DNS record name and the probe's Host/SNI
    pub hostname: String,

    #[serde(default)]
    pub scheme: Scheme,

    /// Explicit port; defaults from the scheme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// HTTP health endpoint; when absent the probe is a bare TCP connect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck_path: Option<String>,

    /// Names of the servers backing this service, in configured order
    #[serde(default, rename = "servers")]
    pub bound_servers: Vec<String>,

    /// Per-service DNS settings
    #[serde(default, rename = "cloudflare", skip_serializing_if = "Option::is_none")]
    pub dns: Option<ServiceDnsSettings>,
}

impl Service {
    /// Port used for probing and for pinning HTTP resolution.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    /// DNS binding for this service, present only when a zone is configured.
    #[must_use]
    pub fn dns_binding(&self) -> Option<DnsBinding> {
        let dns = self.dns.as_ref()?;
        let zone_id = dns.zone_id.as_deref().map(str::trim).filter(|z| !z.is_empty())?;
        Some(DnsBinding {
            zone_id: zone_id.to_string(),
            update_enabled: dns.update_dns,
            ttl: dns.ttl,
            proxied: dns.proxied,
        })
    }
}

/// Per-service DNS block as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDnsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    /// Whether the reconciler may mutate provider records
    #[serde(default)]
    pub update_dns: bool,

    #[serde(default = "default_ttl")]
    pub ttl: u32,

    #[serde(default)]
    pub proxied: bool,
}

fn default_ttl() -> u32 {
    DEFAULT_DNS_RECORD_TTL_SECS
}

/// How a service is bound to a provider zone.
///
/// Presence of a binding gates whether reconciliation runs at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsBinding {
    pub zone_id: String,
    pub update_enabled: bool,
    pub ttl: u32,
    pub proxied: bool,
}

/// Global DNS provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider integration switch for the whole run
    pub enabled: bool,

    /// API base URL
    pub api_base: String,

    /// Environment variable holding the bearer token
    pub token_env: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            token_env: DEFAULT_CLOUDFLARE_TOKEN_ENV.to_string(),
        }
    }
}

/// Run log shipping settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub enabled: bool,

    /// Target repository as `owner/name`
    pub repository: Option<String>,

    pub branch: String,

    /// Environment variable holding the repository token
    pub token_env: String,

    /// Repository contents API base URL
    pub api_base: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            repository: None,
            branch: DEFAULT_LOG_BRANCH.to_string(),
            api_base: GITHUB_API_BASE.to_string(),
            token_env: DEFAULT_GITHUB_TOKEN_ENV.to_string(),
        }
    }
}

impl Config {
    /// Look up a server by name.
    #[must_use]
    pub fn server(&self, name: &str) -> Option<&Server> {
        find_server(&self.servers, name)
    }

    /// Look up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Services that take part in a run, in configuration order.
    ///
    /// A later service reusing an earlier name is dropped, and so is a service
    /// reported as [`ConfigError::InvalidService`] by [`validate_config`].
    #[must_use]
    pub fn active_services(&self) -> Vec<&Service> {
        let mut seen = HashSet::new();
        self.services
            .iter()
            .filter(|service| seen.insert(service.name.as_str()))
            .filter(|service| service_defects(service).is_empty())
            .collect()
    }
}

/// Find a server by name in a server list.
#[must_use]
pub fn find_server<'a>(servers: &'a [Server], name: &str) -> Option<&'a Server> {
    servers.iter().find(|s| s.name == name)
}

/// Parse a configuration document.
///
/// `path` only selects the format (`.yaml`/`.yml` is YAML, anything else JSON)
/// and labels errors.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the document does not match the schema.
pub fn parse_config(content: &str, path: &Path) -> Result<Config, ConfigError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let parsed = if is_yaml {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| ConfigError::Parse {
        path: path.display().to_string(),
        reason,
    })
}

/// Load a configuration file from disk.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or
/// [`ConfigError::Parse`] if it cannot be parsed.
pub async fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
    parse_config(&content, path)
}

/// Problems that make a service unusable for probing and reconciliation.
fn service_defects(service: &Service) -> Vec<String> {
    let mut defects = Vec::new();
    if service.hostname.trim().is_empty() {
        defects.push("hostname is empty".to_string());
    }
    if let Some(path) = &service.healthcheck_path {
        if !path.starts_with('/') {
            defects.push(format!("healthcheck_path '{path}' must start with '/'"));
        }
    }
    defects
}

/// Semantic checks that serde cannot express.
///
/// Returns every problem found. None of them is fatal: the offending entry is
/// skipped where it matters and the run continues.
#[must_use]
pub fn validate_config(config: &Config) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    let mut server_names = HashSet::new();
    for server in &config.servers {
        if !server_names.insert(server.name.as_str()) {
            errors.push(ConfigError::DuplicateServer {
                name: server.name.clone(),
            });
        }
    }

    let mut service_names = HashSet::new();
    for service in &config.services {
        if !service_names.insert(service.name.as_str()) {
            errors.push(ConfigError::DuplicateService {
                name: service.name.clone(),
            });
        }

        errors.extend(
            service_defects(service)
                .into_iter()
                .map(|reason| ConfigError::InvalidService {
                    service: service.name.clone(),
                    reason,
                }),
        );

        let mut seen = HashSet::new();
        for name in &service.bound_servers {
            if !seen.insert(name.as_str()) {
                errors.push(ConfigError::DuplicateServerReference {
                    service: service.name.clone(),
                    server: name.clone(),
                });
            } else if !server_names.contains(name.as_str()) {
                errors.push(ConfigError::UnknownServer {
                    service: service.name.clone(),
                    server: name.clone(),
                });
            }
        }
    }

    errors
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
