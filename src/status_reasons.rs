// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard diagnostic reasons for ha-monitor runs.
//!
//! Reasons are programmatic identifiers in CamelCase that classify every
//! diagnostic a run produces. They appear in the JSON run report and select
//! the title of workflow annotations.
//!
//! # Example Diagnostic
//!
//! ```json
//! {
//!   "service": "app",
//!   "reason": "ProviderInternalError",
//!   "message": "DNS provider internal error (500)"
//! }
//! ```
//!
//! # Reason Categories
//!
//! - **Configuration** - Problems in the run configuration
//! - **Credentials** - Missing or unusable provider token
//! - **Provider** - HTTP failures talking to the DNS provider
//! - **Reconciliation** - DNS drift and mutation outcomes
//! - **Health** - Server availability

// ============================================================================
// Configuration Reasons
// ============================================================================

/// A server or service definition is invalid or references something unknown
pub const REASON_CONFIGURATION_INVALID: &str = "ConfigurationInvalid";

// ============================================================================
// Credential Reasons
// ============================================================================

/// Provider token environment variable is unset or empty
pub const REASON_CREDENTIAL_MISSING: &str = "CredentialMissing";

/// Provider token cannot be sent as an HTTP header
pub const REASON_CREDENTIAL_INVALID: &str = "CredentialInvalid";

// ============================================================================
// Provider Reasons
// ============================================================================

/// Provider rejected the request as malformed (HTTP 400)
pub const REASON_PROVIDER_BAD_REQUEST: &str = "ProviderBadRequest";

/// Provider rejected the token (HTTP 401/403)
pub const REASON_PROVIDER_AUTH_FAILED: &str = "ProviderAuthFailed";

/// Zone or record not found at the provider (HTTP 404)
pub const REASON_ZONE_NOT_FOUND: &str = "ZoneNotFound";

/// Provider is rate limiting requests (HTTP 429)
pub const REASON_PROVIDER_RATE_LIMITED: &str = "ProviderRateLimited";

/// Provider failed internally (HTTP 500)
pub const REASON_PROVIDER_INTERNAL_ERROR: &str = "ProviderInternalError";

/// Gateway in front of the provider failed (HTTP 502/503/504)
pub const REASON_GATEWAY_ERROR: &str = "GatewayError";

/// Provider could not be reached or answered with an unexpected status
pub const REASON_PROVIDER_UNREACHABLE: &str = "ProviderUnreachable";

/// Provider answered 2xx with a payload that could not be understood
pub const REASON_PROVIDER_INVALID_RESPONSE: &str = "ProviderInvalidResponse";

/// A published address record does not hold an IPv4 address
pub const REASON_INVALID_RECORD: &str = "InvalidRecord";

// ============================================================================
// Reconciliation Reasons
// ============================================================================

/// Published addresses differ from the healthy set
pub const REASON_DNS_STATE_MISMATCH: &str = "DnsStateMismatch";

/// Drift observed but updates are disabled for the service
pub const REASON_DNS_UPDATES_DISABLED: &str = "DnsUpdatesDisabled";

/// One or more record mutations were rejected
pub const REASON_MUTATION_FAILED: &str = "MutationFailed";

// ============================================================================
// Health Reasons
// ============================================================================

/// Every server of a service with DNS updates enabled is unhealthy
pub const REASON_NO_HEALTHY_SERVERS: &str = "NoHealthyServers";

/// At least one server failed its probe
pub const REASON_SERVERS_UNHEALTHY: &str = "ServersUnhealthy";

// ============================================================================
// Log Shipping Reasons
// ============================================================================

/// Run log could not be appended to the repository
pub const REASON_LOG_SHIPPING_FAILED: &str = "LogShippingFailed";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
