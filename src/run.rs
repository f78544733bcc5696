// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! One invocation of the monitor: probe every service, then reconcile DNS.
//!
//! Each phase returns plain data plus the diagnostics it produced. Nothing in
//! this module aborts on a per-service or per-server problem; the report
//! always carries whatever progress was made.

use crate::config::{Config, DnsBinding, Service};
use crate::errors::{ConfigError, ProviderSetupError};
use crate::health::{check_all_services, Probe};
use crate::http_errors::{map_reconcile_error, map_setup_error};
use crate::metrics;
use crate::model::{DnsReport, HealthReport};
use crate::provider::DnsProvider;
use crate::reconcilers::{reconcile_service, ReconcileMode};
use crate::status_reasons::{
    REASON_CONFIGURATION_INVALID, REASON_MUTATION_FAILED, REASON_NO_HEALTHY_SERVERS,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Human-readable problem found during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Service concerned; `None` for run-wide problems
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Reason from [`crate::status_reasons`]
    pub reason: String,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(service: Option<&str>, reason: &str, message: impl Into<String>) -> Self {
        Self {
            service: service.map(ToString::to_string),
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    fn from_config_error(error: &ConfigError) -> Self {
        let service = match error {
            ConfigError::UnknownServer { service, .. }
            | ConfigError::DuplicateServerReference { service, .. }
            | ConfigError::InvalidService { service, .. } => Some(service.as_str()),
            _ => None,
        };
        Self::new(service, REASON_CONFIGURATION_INVALID, error.to_string())
    }
}

/// Output of the health phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthPhase {
    pub results: BTreeMap<String, HealthReport>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Output of the DNS phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsPhase {
    /// Services that were reconciled; fetch failures are absent
    pub results: BTreeMap<String, DnsReport>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything a run produced, as handed to logging and report consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub health_results: BTreeMap<String, HealthReport>,
    #[serde(default)]
    pub dns_results: BTreeMap<String, DnsReport>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    /// Assemble the report of a run from its phases.
    #[must_use]
    pub fn new(config: &Config, health: HealthPhase, dns: DnsPhase) -> Self {
        let mut diagnostics = health.diagnostics;
        diagnostics.extend(no_healthy_server_warnings(config, &health.results));
        diagnostics.extend(dns.diagnostics);
        Self {
            health_results: health.results,
            dns_results: dns.results,
            diagnostics,
        }
    }

    /// The run fails when any server of any service failed its probe.
    #[must_use]
    pub fn should_fail(&self) -> bool {
        self.health_results.values().any(HealthReport::has_failures)
    }

    /// Names of services with at least one failed server.
    pub fn failing_services(&self) -> impl Iterator<Item = &str> {
        self.health_results
            .iter()
            .filter(|(_, report)| report.has_failures())
            .map(|(name, _)| name.as_str())
    }
}

/// Probe every configured service.
pub async fn execute_health_checks<P: Probe + ?Sized>(config: &Config, probe: &P) -> HealthPhase {
    let mut diagnostics: Vec<Diagnostic> = crate::config::validate_config(config)
        .iter()
        .filter(|e| {
            matches!(
                e,
                ConfigError::DuplicateServer { .. }
                    | ConfigError::DuplicateService { .. }
                    | ConfigError::InvalidService { .. }
            )
        })
        .inspect(|e| warn!("{e}"))
        .map(Diagnostic::from_config_error)
        .collect();

    let mut results = BTreeMap::new();
    for (name, health) in check_all_services(config, probe).await {
        diagnostics.extend(health.warnings.iter().map(Diagnostic::from_config_error));
        results.insert(name, health.report);
    }

    HealthPhase {
        results,
        diagnostics,
    }
}

/// Services that take part in DNS reconciliation, with their binding.
#[must_use]
pub fn reconciliation_targets(config: &Config) -> Vec<(&Service, DnsBinding)> {
    if !config.cloudflare.enabled {
        return Vec::new();
    }
    config
        .active_services()
        .into_iter()
        .filter_map(|service| service.dns_binding().map(|binding| (service, binding)))
        .collect()
}

/// Reconcile DNS for every service with a binding.
///
/// `connect` is only called when at least one service needs the provider. A
/// setup failure skips reconciliation for every service with one diagnostic.
/// A service missing from `health` is skipped.
pub async fn execute_reconciliation<F>(
    config: &Config,
    health: &BTreeMap<String, HealthReport>,
    connect: F,
    mode: ReconcileMode,
) -> DnsPhase
where
    F: FnOnce() -> Result<Arc<dyn DnsProvider>, ProviderSetupError>,
{
    let mut phase = DnsPhase::default();

    let targets = reconciliation_targets(config);
    if targets.is_empty() {
        debug!(
            provider_enabled = config.cloudflare.enabled,
            "No services to reconcile"
        );
        return phase;
    }

    let provider = match connect() {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = %e, "DNS provider unavailable, skipping reconciliation");
            metrics::record_error("credential");
            phase
                .diagnostics
                .push(Diagnostic::new(None, map_setup_error(&e), e.to_string()));
            return phase;
        }
    };

    let mut work = Vec::with_capacity(targets.len());
    for (service, binding) in targets {
        match health.get(&service.name) {
            Some(report) => work.push((service, binding, report)),
            None => {
                warn!(service = %service.name, "No health result, skipping DNS reconciliation");
                phase.diagnostics.push(Diagnostic::new(
                    Some(&service.name),
                    REASON_CONFIGURATION_INVALID,
                    format!("No health result for service {}", service.name),
                ));
            }
        }
    }

    info!(services = work.len(), mode = ?mode, "Reconciling DNS");
    let provider = provider.as_ref();
    let outcomes = join_all(work.iter().map(|(service, binding, report)| async move {
        let outcome =
            reconcile_service(provider, service, binding, report, &config.servers, mode).await;
        (*service, outcome)
    }))
    .await;

    for (service, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                for failed in result.failed_mutations() {
                    phase.diagnostics.push(Diagnostic::new(
                        Some(&service.name),
                        REASON_MUTATION_FAILED,
                        format!(
                            "Failed to {} {} for {}: {}",
                            failed.action.as_str(),
                            failed.ip,
                            service.hostname,
                            failed.error.as_deref().unwrap_or_default()
                        ),
                    ));
                }
                phase
                    .results
                    .insert(service.name.clone(), DnsReport::from(&result));
            }
            Err(e) => {
                error!(service = %service.name, error = %e, "DNS reconciliation failed");
                metrics::record_error("provider_fetch");
                let (reason, summary) = map_reconcile_error(&e);
                phase.diagnostics.push(Diagnostic::new(
                    Some(&service.name),
                    reason,
                    format!("{summary}: {e}"),
                ));
            }
        }
    }

    phase
}

/// Warn about services that would lose every address record.
#[must_use]
pub fn no_healthy_server_warnings(
    config: &Config,
    health: &BTreeMap<String, HealthReport>,
) -> Vec<Diagnostic> {
    health
        .iter()
        .filter(|(_, report)| report.healthy_servers.is_empty())
        .filter(|(name, _)| {
            config
                .service(name)
                .and_then(|service| service.dns.as_ref())
                .is_some_and(|dns| dns.update_dns)
        })
        .map(|(name, _)| {
            warn!(service = %name, "No healthy servers but DNS updates are enabled");
            Diagnostic::new(
                Some(name),
                REASON_NO_HEALTHY_SERVERS,
                format!("Service {name} has no healthy servers but DNS updates are enabled"),
            )
        })
        .collect()
}

/// Run both phases.
pub async fn execute_run<P, F>(
    config: &Config,
    probe: &P,
    connect: F,
    mode: ReconcileMode,
) -> RunReport
where
    P: Probe + ?Sized,
    F: FnOnce() -> Result<Arc<dyn DnsProvider>, ProviderSetupError>,
{
    let health = execute_health_checks(config, probe).await;
    let dns = execute_reconciliation(config, &health.results, connect, mode).await;
    RunReport::new(config, health, dns)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod run_tests;
