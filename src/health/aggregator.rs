// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-service health aggregation.

use super::probe::{Probe, ProbeTarget};
use crate::config::{find_server, Config, Server, Service};
use crate::errors::ConfigError;
use crate::metrics;
use crate::model::{FailedServer, HealthReport};
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Health report for one service plus the configuration problems met while
/// building it.
#[derive(Debug)]
pub struct ServiceHealth {
    pub report: HealthReport,
    pub warnings: Vec<ConfigError>,
}

/// Resolve a service's bound server names against the server list.
///
/// Unknown names and repeated names are returned as warnings and excluded, so
/// they are neither probed nor counted.
#[must_use]
pub fn resolve_bound_servers<'a>(
    service: &Service,
    servers: &'a [Server],
) -> (Vec<&'a Server>, Vec<ConfigError>) {
    let mut resolved = Vec::with_capacity(service.bound_servers.len());
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for name in &service.bound_servers {
        if !seen.insert(name.as_str()) {
            warnings.push(ConfigError::DuplicateServerReference {
                service: service.name.clone(),
                server: name.clone(),
            });
            continue;
        }
        match find_server(servers, name) {
            Some(server) => resolved.push(server),
            None => warnings.push(ConfigError::UnknownServer {
                service: service.name.clone(),
                server: name.clone(),
            }),
        }
    }

    (resolved, warnings)
}

/// Probe every server bound to `service` and aggregate the results.
///
/// All probes run concurrently. Healthy server names keep their configured
/// order.
pub async fn check_service_health<P: Probe + ?Sized>(
    service: &Service,
    servers: &[Server],
    probe: &P,
) -> ServiceHealth {
    info!(
        service = %service.name,
        hostname = %service.hostname,
        mode = if service.healthcheck_path.is_some() { "http" } else { "tcp" },
        port = service.effective_port(),
        "Checking service health"
    );

    let (resolved, warnings) = resolve_bound_servers(service, servers);
    for warning in &warnings {
        warn!(service = %service.name, "{warning}");
    }

    let outcomes = join_all(resolved.iter().map(|server| async move {
        let target = ProbeTarget::for_server(service, server);
        (*server, probe.probe(&target).await)
    }))
    .await;

    let mut report = HealthReport {
        total_count: outcomes.len(),
        ..HealthReport::default()
    };

    for (server, outcome) in outcomes {
        match outcome {
            Ok(detail) => {
                debug!(
                    service = %service.name,
                    server = %server.name,
                    ip = %server.ip,
                    detail = %detail,
                    "Server healthy"
                );
                metrics::record_probe(&service.name, true);
                report.healthy_servers.push(server.name.clone());
            }
            Err(error) => {
                warn!(
                    service = %service.name,
                    server = %server.name,
                    ip = %server.ip,
                    error = %error,
                    "Server failed health check"
                );
                metrics::record_probe(&service.name, false);
                report.failed_count += 1;
                report.failures.push(FailedServer {
                    server: server.name.clone(),
                    ip: server.ip,
                    error: error.to_string(),
                });
            }
        }
    }

    metrics::set_healthy_servers(&service.name, report.healthy_count());
    info!(
        service = %service.name,
        healthy = report.healthy_count(),
        total = report.total_count,
        "Summary for {}: {}/{} healthy",
        service.name,
        report.healthy_count(),
        report.total_count
    );

    ServiceHealth { report, warnings }
}

/// Check every configured service concurrently.
///
/// Only [`Config::active_services`] are checked: duplicate names after the
/// first and invalid services are left out.
pub async fn check_all_services<P: Probe + ?Sized>(
    config: &Config,
    probe: &P,
) -> BTreeMap<String, ServiceHealth> {
    let services = config.active_services();

    let checks = join_all(services.iter().map(|service| async move {
        let health = check_service_health(service, &config.servers, probe).await;
        (service.name.clone(), health)
    }))
    .await;

    checks.into_iter().collect()
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod aggregator_tests;
