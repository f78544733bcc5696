// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for ha-monitor.
//!
//! This module provides specialized error types for:
//! - Configuration loading and validation
//! - Provider credentials and client setup
//! - DNS provider HTTP API operations (listing, creating, deleting records)
//! - Reconciliation of a single service
//! - Run log shipping
//! - Server health probes
//!
//! Errors local to one service or one server never abort processing of their
//! siblings. Only [`ConfigError::Io`] and [`ConfigError::Parse`] are fatal to a run.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Errors raised while loading or validating the run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        /// Path of the configuration file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON/YAML for the expected schema
    #[error("Failed to parse configuration '{path}': {reason}")]
    Parse {
        /// Path of the configuration file
        path: String,
        /// Parser error message
        reason: String,
    },

    /// A service references a server that is not defined
    #[error("Server '{server}' not found in server definitions (service '{service}')")]
    UnknownServer {
        /// Service holding the reference
        service: String,
        /// Unresolved server name
        server: String,
    },

    /// A service lists the same server more than once
    #[error("Server '{server}' listed more than once for service '{service}'")]
    DuplicateServerReference {
        /// Service holding the reference
        service: String,
        /// Repeated server name
        server: String,
    },

    /// Two server definitions share a name
    #[error("Server name '{name}' is defined more than once")]
    DuplicateServer {
        /// Repeated server name
        name: String,
    },

    /// Two service definitions share a name
    #[error("Service name '{name}' is defined more than once")]
    DuplicateService {
        /// Repeated service name
        name: String,
    },

    /// A service definition is unusable
    #[error("Invalid service '{service}': {reason}")]
    InvalidService {
        /// Service name
        service: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

impl ConfigError {
    /// Whether this error makes the whole run input unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Parse { .. })
    }
}

/// Errors related to the bearer credential used against the DNS provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Token environment variable is unset or empty
    #[error("No API token found in environment variable '{env_var}'")]
    MissingToken {
        /// Name of the environment variable that was checked
        env_var: String,
    },

    /// Token contains characters that cannot be sent in an HTTP header
    #[error("API token in '{env_var}' is not a valid header value")]
    InvalidToken {
        /// Name of the environment variable that was checked
        env_var: String,
    },
}

/// Errors returned by a DNS provider API call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never produced a response (DNS, connect, TLS, timeout)
    #[error("Request to {url} failed: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Transport error message
        reason: String,
    },

    /// The provider answered with a non-2xx status
    #[error("Provider returned HTTP {status} for {url}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Response body, kept for operator diagnosis
        body: String,
    },

    /// The provider answered 2xx but the payload could not be understood
    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse {
        /// Requested URL
        url: String,
        /// Decoding error message
        reason: String,
    },
}

impl ProviderError {
    /// HTTP status carried by this error, if the provider answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised while building the DNS provider client for a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderSetupError {
    /// Bearer token unavailable
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Client could not be constructed (invalid API base URL, TLS setup)
    #[error(transparent)]
    Client(#[from] ProviderError),
}

/// Errors that stop reconciliation of a single service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Listing the current address records failed
    #[error("Failed to fetch DNS records for '{hostname}' in zone '{zone_id}': {source}")]
    Fetch {
        /// Hostname that was queried
        hostname: String,
        /// Zone identifier
        zone_id: String,
        /// Provider failure
        #[source]
        source: ProviderError,
    },

    /// A fetched address record does not hold an IPv4 address
    #[error("Record '{record_id}' for '{hostname}' has invalid address content '{content}'")]
    InvalidRecord {
        /// Hostname that was queried
        hostname: String,
        /// Provider record identifier
        record_id: String,
        /// Raw record content
        content: String,
    },
}

/// Errors raised while appending the run log to the repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogStoreError {
    /// Logging is enabled but no repository is configured
    #[error("Log shipping enabled but no repository configured")]
    MissingRepository,

    /// Repository token unavailable
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The request never produced a response
    #[error("Request to {url} failed: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Transport error message
        reason: String,
    },

    /// The contents API answered with an unexpected status
    #[error("Contents API returned HTTP {status} for {url}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Response body
        body: String,
    },

    /// The existing file could not be decoded
    #[error("Invalid contents response from {url}: {reason}")]
    InvalidResponse {
        /// Requested URL
        url: String,
        /// Decoding error message
        reason: String,
    },
}

/// Reasons a single server health probe was judged unhealthy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// No answer within the probe timeout
    #[error("Connection timeout")]
    Timeout,

    /// TCP connection was refused or reset
    #[error("Port {port} closed")]
    PortClosed {
        /// Probed port
        port: u16,
    },

    /// TCP connection failed for another reason (unreachable, etc.)
    #[error("Connection to {ip}:{port} failed: {reason}")]
    Connect {
        /// Probed address
        ip: Ipv4Addr,
        /// Probed port
        port: u16,
        /// OS error message
        reason: String,
    },

    /// HTTP probe answered with a status other than 200
    #[error("HTTP {status}")]
    HttpStatus {
        /// Returned status code
        status: u16,
    },

    /// HTTP probe could not be completed (connect, TLS, protocol error)
    #[error("{reason}")]
    Request {
        /// Client error message
        reason: String,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
