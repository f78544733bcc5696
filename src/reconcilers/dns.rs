// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS reconciliation for a single service.
//!
//! The reconciler derives the desired address set from a [`HealthReport`],
//! reads the published address set from the provider, diffs the two and,
//! when updates are enabled, issues one create or delete per differing
//! address. Nothing is cached: every call starts from the provider's records.

use crate::config::{find_server, DnsBinding, Server, Service};
use crate::errors::ReconcileError;
use crate::metrics;
use crate::model::{
    DnsDiff, HealthReport, MutationAction, MutationOutcome, ReconciliationResult,
    ReconciliationStatus,
};
use crate::provider::{DnsProvider, DnsRecord, NewRecord};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use tracing::{debug, info, warn};

/// Whether drift is corrected or only reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Issue provider mutations when updates are enabled
    #[default]
    Apply,
    /// Never mutate; drift with updates enabled is reported as `Mismatch`
    DryRun,
}

/// Resolve healthy server names to their addresses.
///
/// Names with no matching server are skipped.
#[must_use]
pub fn desired_ips(report: &HealthReport, servers: &[Server]) -> BTreeSet<Ipv4Addr> {
    report
        .healthy_servers
        .iter()
        .filter_map(|name| find_server(servers, name).map(|server| server.ip))
        .collect()
}

/// Classify a diff.
#[must_use]
pub fn classify(diff: &DnsDiff, update_enabled: bool, mode: ReconcileMode) -> ReconciliationStatus {
    if diff.is_in_sync() {
        ReconciliationStatus::InSync
    } else if !update_enabled {
        ReconciliationStatus::UpdateDisabled
    } else if mode == ReconcileMode::DryRun {
        ReconciliationStatus::Mismatch
    } else {
        ReconciliationStatus::Updated
    }
}

/// Group fetched records by address.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidRecord`] if a record does not hold an
/// IPv4 address.
pub fn published_ips(
    hostname: &str,
    records: &[DnsRecord],
) -> Result<BTreeMap<Ipv4Addr, Vec<String>>, ReconcileError> {
    let mut published: BTreeMap<Ipv4Addr, Vec<String>> = BTreeMap::new();
    for record in records {
        let ip: Ipv4Addr =
            record
                .content
                .trim()
                .parse()
                .map_err(|_| ReconcileError::InvalidRecord {
                    hostname: hostname.to_string(),
                    record_id: record.id.clone(),
                    content: record.content.clone(),
                })?;
        published.entry(ip).or_default().push(record.id.clone());
    }
    Ok(published)
}

/// Reconcile the published address records of `service` with its health.
///
/// Mutations are only issued when the result is `Updated`. Each delete and
/// create runs independently; a failed mutation is recorded in the result and
/// does not stop the others. The reported diff is the intended change and is
/// not re-read from the provider.
///
/// # Errors
///
/// Returns [`ReconcileError`] if the current records cannot be fetched or
/// parsed. No mutation is attempted in that case.
pub async fn reconcile_service<P: DnsProvider + ?Sized>(
    provider: &P,
    service: &Service,
    binding: &DnsBinding,
    report: &HealthReport,
    servers: &[Server],
    mode: ReconcileMode,
) -> Result<ReconciliationResult, ReconcileError> {
    debug!(
        service = %service.name,
        hostname = %service.hostname,
        zone_id = %binding.zone_id,
        "Reconciling DNS records"
    );

    let records = provider
        .list_records(&binding.zone_id, &service.hostname)
        .await
        .map_err(|source| ReconcileError::Fetch {
            hostname: service.hostname.clone(),
            zone_id: binding.zone_id.clone(),
            source,
        });
    let published = match records.and_then(|records| published_ips(&service.hostname, &records)) {
        Ok(published) => published,
        Err(e) => {
            metrics::record_reconciliation_error(&service.name);
            return Err(e);
        }
    };

    let diff = DnsDiff::compute(
        published.keys().copied().collect(),
        desired_ips(report, servers),
    );
    let status = classify(&diff, binding.update_enabled, mode);

    let mutations = if status == ReconciliationStatus::Updated {
        apply_diff(provider, service, binding, &diff, &published).await
    } else {
        Vec::new()
    };

    metrics::record_reconciliation(&service.name, status);
    info!(
        service = %service.name,
        status = %status,
        previous = ?diff.previous,
        target = ?diff.target,
        "DNS reconciliation complete"
    );

    Ok(ReconciliationResult {
        status,
        diff,
        mutations,
    })
}

/// Issue every delete and create of `diff` concurrently.
async fn apply_diff<P: DnsProvider + ?Sized>(
    provider: &P,
    service: &Service,
    binding: &DnsBinding,
    diff: &DnsDiff,
    published: &BTreeMap<Ipv4Addr, Vec<String>>,
) -> Vec<MutationOutcome> {
    let zone_id = binding.zone_id.as_str();

    let deletes = diff.to_remove.iter().flat_map(|ip| {
        published
            .get(ip)
            .into_iter()
            .flatten()
            .map(move |record_id| (*ip, record_id.as_str()))
    });
    let deletes = join_all(deletes.map(|(ip, record_id)| async move {
        let result = provider.delete_record(zone_id, record_id).await;
        outcome(service, MutationAction::Delete, ip, result)
    }));

    let creates = join_all(diff.to_add.iter().map(|ip| async move {
        let record = NewRecord::address(&service.hostname, *ip, binding.ttl, binding.proxied);
        let result = provider.create_record(zone_id, &record).await;
        outcome(service, MutationAction::Create, *ip, result)
    }));

    let (deleted, created) = futures::join!(deletes, creates);
    deleted.into_iter().chain(created).collect()
}

fn outcome(
    service: &Service,
    action: MutationAction,
    ip: Ipv4Addr,
    result: Result<(), crate::errors::ProviderError>,
) -> MutationOutcome {
    metrics::record_mutation(action, result.is_ok());
    match result {
        Ok(()) => {
            info!(
                service = %service.name,
                hostname = %service.hostname,
                action = action.as_str(),
                ip = %ip,
                "DNS record mutation succeeded"
            );
            MutationOutcome {
                action,
                ip,
                error: None,
            }
        }
        Err(e) => {
            warn!(
                service = %service.name,
                hostname = %service.hostname,
                action = action.as_str(),
                ip = %ip,
                error = %e,
                "DNS record mutation failed"
            );
            metrics::record_error("provider_mutation");
            MutationOutcome {
                action,
                ip,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
#[path = "dns_tests.rs"]
mod dns_tests;
