// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider error mapping to diagnostic reasons.
//!
//! Converts HTTP status codes and other provider failures into the stable
//! reasons defined in [`crate::status_reasons`], so that diagnostics and
//! annotations read the same way regardless of which call failed.
//!
//! # Usage
//!
//! ```rust
//! use ha_monitor::http_errors::map_http_error_to_reason;
//!
//! let (reason, message) = map_http_error_to_reason(404);
//! assert_eq!(reason, "ZoneNotFound");
//!
//! let (reason, message) = map_http_error_to_reason(429);
//! assert_eq!(reason, "ProviderRateLimited");
//! ```

use crate::errors::{CredentialError, ProviderError, ProviderSetupError, ReconcileError};
use crate::status_reasons::{
    REASON_CREDENTIAL_INVALID, REASON_CREDENTIAL_MISSING, REASON_GATEWAY_ERROR,
    REASON_INVALID_RECORD, REASON_PROVIDER_AUTH_FAILED, REASON_PROVIDER_BAD_REQUEST,
    REASON_PROVIDER_INTERNAL_ERROR, REASON_PROVIDER_INVALID_RESPONSE,
    REASON_PROVIDER_RATE_LIMITED, REASON_PROVIDER_UNREACHABLE, REASON_ZONE_NOT_FOUND,
};

/// Map an HTTP status code from the DNS provider to a reason and message.
///
/// # HTTP Code Mapping
///
/// | HTTP Code | Reason | Meaning |
/// |-----------|--------|---------|
/// | 400 | `ProviderBadRequest` | Invalid request format |
/// | 401 | `ProviderAuthFailed` | Token missing or rejected |
/// | 403 | `ProviderAuthFailed` | Token lacks permission on the zone |
/// | 404 | `ZoneNotFound` | Zone or record not found |
/// | 429 | `ProviderRateLimited` | Too many requests |
/// | 500 | `ProviderInternalError` | Internal server error |
/// | 502-504 | `GatewayError` | Gateway failure |
/// | Other | `ProviderUnreachable` | Unexpected error |
#[must_use]
pub fn map_http_error_to_reason(status_code: u16) -> (&'static str, String) {
    match status_code {
        400 => (
            REASON_PROVIDER_BAD_REQUEST,
            "Invalid request to DNS provider (400)".into(),
        ),
        401 => (
            REASON_PROVIDER_AUTH_FAILED,
            "DNS provider authentication required (401)".into(),
        ),
        403 => (
            REASON_PROVIDER_AUTH_FAILED,
            "DNS provider authorization failed (403)".into(),
        ),
        404 => (
            REASON_ZONE_NOT_FOUND,
            "Zone or record not found at DNS provider (404)".into(),
        ),
        429 => (
            REASON_PROVIDER_RATE_LIMITED,
            "DNS provider rate limit exceeded (429)".into(),
        ),
        500 => (
            REASON_PROVIDER_INTERNAL_ERROR,
            "DNS provider internal error (500)".into(),
        ),
        502 => (
            REASON_GATEWAY_ERROR,
            "Bad gateway reaching DNS provider (502)".into(),
        ),
        503 => (
            REASON_GATEWAY_ERROR,
            "DNS provider unavailable (503)".into(),
        ),
        504 => (
            REASON_GATEWAY_ERROR,
            "Gateway timeout reaching DNS provider (504)".into(),
        ),
        _ => (
            REASON_PROVIDER_UNREACHABLE,
            format!("Unexpected HTTP error from DNS provider ({status_code})"),
        ),
    }
}

/// Map a connection failure, raised before any HTTP status was received.
#[must_use]
pub fn map_connection_error() -> (&'static str, String) {
    (
        REASON_PROVIDER_UNREACHABLE,
        "Cannot connect to DNS provider".into(),
    )
}

/// Map any provider failure to a reason and message.
#[must_use]
pub fn map_provider_error(error: &ProviderError) -> (&'static str, String) {
    match error {
        ProviderError::Http { status, .. } => map_http_error_to_reason(*status),
        ProviderError::Transport { .. } => map_connection_error(),
        ProviderError::InvalidResponse { reason, .. } => (
            REASON_PROVIDER_INVALID_RESPONSE,
            format!("Unexpected response from DNS provider: {reason}"),
        ),
    }
}

/// Map a reconciliation failure to a reason and message.
#[must_use]
pub fn map_reconcile_error(error: &ReconcileError) -> (&'static str, String) {
    match error {
        ReconcileError::Fetch { source, .. } => map_provider_error(source),
        ReconcileError::InvalidRecord { .. } => (REASON_INVALID_RECORD, error.to_string()),
    }
}

/// Map a credential failure to a reason.
#[must_use]
pub fn map_credential_error(error: &CredentialError) -> &'static str {
    match error {
        CredentialError::MissingToken { .. } => REASON_CREDENTIAL_MISSING,
        CredentialError::InvalidToken { .. } => REASON_CREDENTIAL_INVALID,
    }
}

/// Map a provider setup failure to a reason.
#[must_use]
pub fn map_setup_error(error: &ProviderSetupError) -> &'static str {
    match error {
        ProviderSetupError::Credential(e) => map_credential_error(e),
        ProviderSetupError::Client(e) => map_provider_error(e).0,
    }
}

#[cfg(test)]
#[path = "http_errors_tests.rs"]
mod http_errors_tests;
