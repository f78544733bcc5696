// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for ha-monitor.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Default location of the monitor configuration file
pub const DEFAULT_CONFIG_PATH: &str = ".github/ha-monitor-config.json";

/// Environment variable holding the Cloudflare API token
pub const DEFAULT_CLOUDFLARE_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// Environment variable holding the repository token used for log shipping
pub const DEFAULT_GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable carrying the scheduler's run identifier
pub const RUN_ID_ENV: &str = "GITHUB_RUN_ID";

/// Run identifier used when the scheduler does not provide one
pub const UNKNOWN_RUN_ID: &str = "unknown";

// ============================================================================
// Health Probe Constants
// ============================================================================

/// Timeout for a single health probe (HTTP or TCP)
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Default port probed for `https` services
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Default port probed for `http` services
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// The only HTTP status accepted as healthy
pub const HEALTHY_HTTP_STATUS: u16 = 200;

/// User agent sent with every outgoing HTTP request
pub const HTTP_USER_AGENT: &str = concat!("ha-monitor/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// DNS Provider Constants
// ============================================================================

/// Cloudflare v4 API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Client-level timeout for provider API calls
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Page size requested when listing DNS records
pub const PROVIDER_PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched for a single hostname listing
pub const PROVIDER_MAX_PAGES: u32 = 50;

/// Record type managed by the reconciler
pub const ADDRESS_RECORD_TYPE: &str = "A";

/// Default TTL for created address records (2 minutes)
pub const DEFAULT_DNS_RECORD_TTL_SECS: u32 = 120;

// ============================================================================
// Log Shipping Constants
// ============================================================================

/// GitHub REST API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Directory inside the repository that receives run logs
pub const LOG_DIRECTORY: &str = "logs";

/// Prefix of the daily log file name
pub const LOG_FILE_PREFIX: &str = "healthcheck-";

/// Default branch written to by the log store
pub const DEFAULT_LOG_BRANCH: &str = "main";

/// Accept header for the GitHub contents API
pub const GITHUB_ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;
