// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-run data model shared by the health aggregator and the DNS reconciler.
//!
//! [`HealthReport`] and [`ReconciliationResult`] are produced fresh for every
//! service on every run and never mutated afterwards. Nothing here is cached
//! between runs; the DNS provider is the only state store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

/// Detail kept for every server that failed its probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedServer {
    pub server: String,
    pub ip: Ipv4Addr,
    pub error: String,
}

/// Outcome of probing every server bound to one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Names of healthy servers, in configured order
    pub healthy_servers: Vec<String>,
    pub failed_count: usize,
    /// Servers actually probed (unresolved references excluded)
    pub total_count: usize,
    #[serde(rename = "failed_server_details", default)]
    pub failures: Vec<FailedServer>,
}

impl HealthReport {
    /// Number of healthy servers.
    #[must_use]
    pub fn healthy_count(&self) -> usize {
        self.healthy_servers.len()
    }

    /// `healthy + failed == total`, and every failure is accounted for.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.healthy_count() + self.failed_count == self.total_count
            && self.failures.len() == self.failed_count
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }
}

/// Difference between the addresses published in DNS and the desired ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsDiff {
    /// Addresses currently published by the provider
    pub previous: BTreeSet<Ipv4Addr>,
    /// Addresses of healthy servers
    pub target: BTreeSet<Ipv4Addr>,
    /// `target - previous`
    pub to_add: BTreeSet<Ipv4Addr>,
    /// `previous - target`
    pub to_remove: BTreeSet<Ipv4Addr>,
}

impl DnsDiff {
    /// Compute the diff between published and desired addresses.
    #[must_use]
    pub fn compute(previous: BTreeSet<Ipv4Addr>, target: BTreeSet<Ipv4Addr>) -> Self {
        let to_add = target.difference(&previous).copied().collect();
        let to_remove = previous.difference(&target).copied().collect();
        Self {
            previous,
            target,
            to_add,
            to_remove,
        }
    }

    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.previous == self.target
    }

    /// Addresses that result from applying the diff to `previous`.
    #[must_use]
    pub fn converged(&self) -> BTreeSet<Ipv4Addr> {
        self.previous
            .difference(&self.to_remove)
            .chain(self.to_add.iter())
            .copied()
            .collect()
    }
}

/// Classification of one reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    /// Published addresses already match the healthy set
    #[serde(rename = "ok")]
    InSync,
    /// Drift observed with updates enabled, but no mutation was attempted
    #[serde(rename = "mismatch")]
    Mismatch,
    /// Drift observed and a mutation batch was attempted
    #[serde(rename = "updated")]
    Updated,
    /// Drift observed but updates are disabled for the service
    #[serde(rename = "disabled")]
    UpdateDisabled,
}

impl ReconciliationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InSync => "ok",
            Self::Mismatch => "mismatch",
            Self::Updated => "updated",
            Self::UpdateDisabled => "disabled",
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of provider mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Create,
    Delete,
}

impl MutationAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

/// Result of one provider mutation inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub action: MutationAction,
    pub ip: Ipv4Addr,
    /// Provider error message; `None` when the mutation succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Terminal snapshot of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub status: ReconciliationStatus,
    /// Intended change; not re-verified against the provider after mutating
    pub diff: DnsDiff,
    /// Per-address outcomes of the mutation batch (empty unless `Updated`)
    pub mutations: Vec<MutationOutcome>,
}

impl ReconciliationResult {
    /// Mutations that the provider rejected.
    pub fn failed_mutations(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.mutations.iter().filter(|m| !m.succeeded())
    }
}

/// Address changes as handed to logging and dashboard consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsChanges {
    pub previous: Vec<Ipv4Addr>,
    pub target: Vec<Ipv4Addr>,
    pub removed: Vec<Ipv4Addr>,
    pub added: Vec<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_mutations: Vec<MutationOutcome>,
}

/// Projection of a [`ReconciliationResult`] for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsReport {
    pub status: ReconciliationStatus,
    pub changes: DnsChanges,
}

impl From<&ReconciliationResult> for DnsReport {
    fn from(result: &ReconciliationResult) -> Self {
        Self {
            status: result.status,
            changes: DnsChanges {
                previous: result.diff.previous.iter().copied().collect(),
                target: result.diff.target.iter().copied().collect(),
                removed: result.diff.to_remove.iter().copied().collect(),
                added: result.diff.to_add.iter().copied().collect(),
                failed_mutations: result.failed_mutations().cloned().collect(),
            },
        }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod model_tests;
