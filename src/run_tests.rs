// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `run.rs`

#[cfg(test)]
mod tests {
    use crate::config::{Config, ProviderSettings, Scheme, Server, Service, ServiceDnsSettings};
    use crate::errors::{CredentialError, ProbeError, ProviderError, ProviderSetupError};
    use crate::health::{Probe, ProbeTarget};
    use crate::model::{HealthReport, ReconciliationStatus};
    use crate::provider::{DnsProvider, DnsRecord, NewRecord};
    use crate::reconcilers::ReconcileMode;
    use crate::run::{
        execute_health_checks, execute_reconciliation, execute_run, no_healthy_server_warnings,
        reconciliation_targets, RunReport,
    };
    use crate::status_reasons::*;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Probe that fails the listed addresses with a closed port.
    struct DownProbe(HashSet<Ipv4Addr>);

    #[async_trait::async_trait]
    impl Probe for DownProbe {
        async fn probe(&self, target: &ProbeTarget) -> Result<String, ProbeError> {
            if self.0.contains(&target.ip) {
                Err(ProbeError::PortClosed { port: target.port })
            } else {
                Ok(format!("Port {} open", target.port))
            }
        }
    }

    /// Provider keyed by zone id; zones listed in `broken` answer 500.
    #[derive(Default)]
    struct ZoneProvider {
        zones: Mutex<HashMap<String, Vec<DnsRecord>>>,
        broken: HashSet<String>,
        reject_creates: bool,
        mutations: AtomicUsize,
    }

    impl ZoneProvider {
        fn with_zone(self, zone: &str, ips: &[&str]) -> Self {
            let records = ips
                .iter()
                .enumerate()
                .map(|(i, ip)| DnsRecord {
                    id: format!("{zone}-{i}"),
                    name: String::new(),
                    content: (*ip).to_string(),
                    ttl: None,
                    proxied: None,
                })
                .collect();
            self.zones.lock().unwrap().insert(zone.to_string(), records);
            self
        }
    }

    #[async_trait::async_trait]
    impl DnsProvider for ZoneProvider {
        async fn list_records(
            &self,
            zone_id: &str,
            _hostname: &str,
        ) -> Result<Vec<DnsRecord>, ProviderError> {
            if self.broken.contains(zone_id) {
                return Err(ProviderError::Http {
                    status: 500,
                    url: format!("mock://{zone_id}"),
                    body: "internal".to_string(),
                });
            }
            Ok(self
                .zones
                .lock()
                .unwrap()
                .get(zone_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn create_record(
            &self,
            _zone_id: &str,
            _record: &NewRecord,
        ) -> Result<(), ProviderError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            if self.reject_creates {
                return Err(ProviderError::Http {
                    status: 400,
                    url: "mock://create".to_string(),
                    body: "invalid".to_string(),
                });
            }
            Ok(())
        }

        async fn delete_record(
            &self,
            _zone_id: &str,
            _record_id: &str,
        ) -> Result<(), ProviderError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn server(name: &str, ip: &str) -> Server {
        Server {
            name: name.to_string(),
            ip: ip.parse().unwrap(),
        }
    }

    fn service(name: &str, bound: &[&str], zone: Option<&str>, update_dns: bool) -> Service {
        Service {
            name: name.to_string(),
            hostname: format!("{name}.example.com"),
            scheme: Scheme::Http,
            port: None,
            healthcheck_path: None,
            bound_servers: bound.iter().map(ToString::to_string).collect(),
            dns: zone.map(|zone| ServiceDnsSettings {
                zone_id: Some(zone.to_string()),
                update_dns,
                ttl: 120,
                proxied: false,
            }),
        }
    }

    fn config(services: Vec<Service>) -> Config {
        Config {
            servers: vec![
                server("a", "10.0.0.1"),
                server("b", "10.0.0.2"),
                server("c", "10.0.0.3"),
            ],
            services,
            cloudflare: ProviderSettings {
                enabled: true,
                ..ProviderSettings::default()
            },
            ..Config::default()
        }
    }

    fn report(healthy: &[&str], failed: usize) -> HealthReport {
        HealthReport {
            healthy_servers: healthy.iter().map(ToString::to_string).collect(),
            failed_count: failed,
            total_count: healthy.len() + failed,
            failures: Vec::new(),
        }
    }

    fn connect_to(
        provider: &Arc<ZoneProvider>,
    ) -> impl FnOnce() -> Result<Arc<dyn DnsProvider>, ProviderSetupError> {
        let provider: Arc<dyn DnsProvider> = provider.clone();
        move || Ok(provider)
    }

    // =====================================================
    // Health Phase
    // =====================================================

    #[tokio::test]
    async fn test_health_phase_reports_failures_and_warnings() {
        let config = config(vec![
            service("web", &["a", "b", "ghost"], None, false),
            service("db", &["c"], None, false),
        ]);
        let probe = DownProbe([Ipv4Addr::new(10, 0, 0, 2)].into_iter().collect());

        let phase = execute_health_checks(&config, &probe).await;

        let web = &phase.results["web"];
        assert_eq!(web.healthy_servers, vec!["a"]);
        assert_eq!(web.failed_count, 1);
        assert_eq!(web.total_count, 2);
        assert_eq!(web.failures[0].error, "Port 80 closed");
        assert_eq!(phase.results["db"].failed_count, 0);

        assert_eq!(phase.diagnostics.len(), 1);
        assert_eq!(phase.diagnostics[0].service.as_deref(), Some("web"));
        assert_eq!(phase.diagnostics[0].reason, REASON_CONFIGURATION_INVALID);
        assert!(phase.diagnostics[0].message.contains("ghost"));
    }

    #[tokio::test]
    async fn test_health_phase_reports_duplicate_service_once() {
        let config = config(vec![
            service("web", &["a"], None, false),
            service("web", &["b"], None, false),
        ]);
        let probe = DownProbe(HashSet::new());

        let phase = execute_health_checks(&config, &probe).await;
        assert_eq!(phase.results.len(), 1);
        assert_eq!(phase.results["web"].healthy_servers, vec!["a"]);
        assert_eq!(phase.diagnostics.len(), 1);
        assert!(phase.diagnostics[0].message.contains("more than once"));
    }

    // =====================================================
    // DNS Phase
    // =====================================================

    #[test]
    fn test_targets_require_enabled_provider_and_zone() {
        let mut cfg = config(vec![
            service("bound", &["a"], Some("z1"), true),
            service("unbound", &["a"], None, true),
            service("blank", &["a"], Some("  "), true),
        ]);
        let names: Vec<&str> = reconciliation_targets(&cfg)
            .iter()
            .map(|(s, _)| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["bound"]);

        cfg.cloudflare.enabled = false;
        assert!(reconciliation_targets(&cfg).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_service_is_neither_probed_nor_reconciled() {
        let mut blank = service("blank", &["a"], Some("z1"), true);
        blank.hostname = String::new();
        let cfg = config(vec![blank]);
        let provider = Arc::new(
            ZoneProvider::default().with_zone("z1", &["10.9.9.1", "10.9.9.2", "10.9.9.3"]),
        );

        assert!(reconciliation_targets(&cfg).is_empty());

        let report = execute_run(
            &cfg,
            &DownProbe(HashSet::new()),
            connect_to(&provider),
            ReconcileMode::Apply,
        )
        .await;
        assert!(report.health_results.is_empty());
        assert!(report.dns_results.is_empty());
        assert_eq!(provider.mutations.load(Ordering::SeqCst), 0);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].reason, REASON_CONFIGURATION_INVALID);
        assert!(report.diagnostics[0].message.contains("hostname is empty"));
    }

    #[tokio::test]
    async fn test_invalid_service_in_health_handoff_is_not_reconciled() {
        let mut pathless = service("pathless", &["a"], Some("z1"), true);
        pathless.healthcheck_path = Some("healthz".to_string());
        let cfg = config(vec![pathless]);
        let health = BTreeMap::from([("pathless".to_string(), report(&["a"], 0))]);

        let phase = execute_reconciliation(
            &cfg,
            &health,
            || panic!("provider must not be built"),
            ReconcileMode::Apply,
        )
        .await;
        assert!(phase.results.is_empty());
    }

    #[tokio::test]
    async fn test_provider_not_connected_without_targets() {
        let cfg = config(vec![service("web", &["a"], None, true)]);
        let health = BTreeMap::from([("web".to_string(), report(&["a"], 0))]);

        let phase = execute_reconciliation(
            &cfg,
            &health,
            || panic!("provider must not be built"),
            ReconcileMode::Apply,
        )
        .await;
        assert!(phase.results.is_empty());
        assert!(phase.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_skips_all_reconciliation() {
        let cfg = config(vec![
            service("web", &["a"], Some("z1"), true),
            service("api", &["b"], Some("z2"), false),
        ]);
        let health = BTreeMap::from([
            ("web".to_string(), report(&["a"], 0)),
            ("api".to_string(), report(&["b"], 0)),
        ]);

        let phase = execute_reconciliation(
            &cfg,
            &health,
            || {
                Err(ProviderSetupError::from(CredentialError::MissingToken {
                    env_var: "CLOUDFLARE_API_TOKEN".to_string(),
                }))
            },
            ReconcileMode::Apply,
        )
        .await;

        assert!(phase.results.is_empty());
        assert_eq!(phase.diagnostics.len(), 1);
        assert_eq!(phase.diagnostics[0].service, None);
        assert_eq!(phase.diagnostics[0].reason, REASON_CREDENTIAL_MISSING);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_isolated_to_its_service() {
        let cfg = config(vec![
            service("web", &["a", "b"], Some("good"), false),
            service("api", &["c"], Some("bad"), true),
        ]);
        let health = BTreeMap::from([
            ("web".to_string(), report(&["a", "b"], 0)),
            ("api".to_string(), report(&["c"], 0)),
        ]);
        let provider = Arc::new(ZoneProvider {
            broken: ["bad".to_string()].into_iter().collect(),
            ..ZoneProvider::default()
        }
        .with_zone("good", &["10.0.0.1"]));

        let phase =
            execute_reconciliation(&cfg, &health, connect_to(&provider), ReconcileMode::Apply)
                .await;

        assert_eq!(phase.results.len(), 1);
        let web = &phase.results["web"];
        assert_eq!(web.status, ReconciliationStatus::UpdateDisabled);
        assert_eq!(web.changes.added, vec![Ipv4Addr::new(10, 0, 0, 2)]);
        assert!(!phase.results.contains_key("api"));

        assert_eq!(phase.diagnostics.len(), 1);
        assert_eq!(phase.diagnostics[0].service.as_deref(), Some("api"));
        assert_eq!(phase.diagnostics[0].reason, REASON_PROVIDER_INTERNAL_ERROR);
        assert_eq!(provider.mutations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_service_without_health_result_is_skipped() {
        let cfg = config(vec![service("web", &["a"], Some("z1"), true)]);
        let provider = Arc::new(ZoneProvider::default());

        let phase = execute_reconciliation(
            &cfg,
            &BTreeMap::new(),
            connect_to(&provider),
            ReconcileMode::Apply,
        )
        .await;

        assert!(phase.results.is_empty());
        assert_eq!(phase.diagnostics.len(), 1);
        assert!(phase.diagnostics[0].message.contains("No health result"));
    }

    #[tokio::test]
    async fn test_failed_mutations_become_diagnostics() {
        let cfg = config(vec![service("web", &["a"], Some("z1"), true)]);
        let health = BTreeMap::from([("web".to_string(), report(&["a"], 0))]);
        let provider = Arc::new(ZoneProvider {
            reject_creates: true,
            ..ZoneProvider::default()
        });

        let phase =
            execute_reconciliation(&cfg, &health, connect_to(&provider), ReconcileMode::Apply)
                .await;

        let web = &phase.results["web"];
        assert_eq!(web.status, ReconciliationStatus::Updated);
        assert_eq!(web.changes.failed_mutations.len(), 1);
        assert_eq!(phase.diagnostics.len(), 1);
        assert_eq!(phase.diagnostics[0].reason, REASON_MUTATION_FAILED);
        assert!(phase.diagnostics[0].message.contains("create 10.0.0.1"));
    }

    // =====================================================
    // Run Report
    // =====================================================

    #[test]
    fn test_no_healthy_server_warning_requires_update_dns() {
        let cfg = config(vec![
            service("web", &["a"], Some("z1"), true),
            service("api", &["b"], Some("z2"), false),
        ]);
        let health = BTreeMap::from([
            ("web".to_string(), report(&[], 1)),
            ("api".to_string(), report(&[], 1)),
        ]);

        let warnings = no_healthy_server_warnings(&cfg, &health);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].service.as_deref(), Some("web"));
        assert_eq!(warnings[0].reason, REASON_NO_HEALTHY_SERVERS);
    }

    #[test]
    fn test_should_fail_follows_failed_count_only() {
        let mut report_ok = RunReport::default();
        report_ok
            .health_results
            .insert("web".to_string(), report(&["a"], 0));
        assert!(!report_ok.should_fail());

        let mut failing = report_ok.clone();
        failing
            .health_results
            .insert("api".to_string(), report(&["b"], 1));
        assert!(failing.should_fail());
        assert_eq!(failing.failing_services().collect::<Vec<_>>(), vec!["api"]);
    }

    #[tokio::test]
    async fn test_execute_run_end_to_end() {
        let cfg = config(vec![service("web", &["a", "b", "c"], Some("z1"), true)]);
        let probe = DownProbe([Ipv4Addr::new(10, 0, 0, 1)].into_iter().collect());
        let provider = Arc::new(ZoneProvider::default().with_zone("z1", &["10.0.0.1", "10.0.0.2"]));

        let report = execute_run(&cfg, &probe, connect_to(&provider), ReconcileMode::Apply).await;

        assert!(report.should_fail());
        let dns = &report.dns_results["web"];
        assert_eq!(dns.status, ReconciliationStatus::Updated);
        assert_eq!(dns.changes.removed, vec![Ipv4Addr::new(10, 0, 0, 1)]);
        assert_eq!(dns.changes.added, vec![Ipv4Addr::new(10, 0, 0, 3)]);
        assert_eq!(provider.mutations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_report_serializes_produced_data_contract() {
        let mut report = RunReport::default();
        report
            .health_results
            .insert("web".to_string(), report_with_failure());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["health_results"]["web"]["failed_count"], 1);
        assert_eq!(
            json["health_results"]["web"]["failed_server_details"][0]["server"],
            "b"
        );
        assert!(json["dns_results"].as_object().unwrap().is_empty());
    }

    fn report_with_failure() -> HealthReport {
        HealthReport {
            healthy_servers: vec!["a".to_string()],
            failed_count: 1,
            total_count: 2,
            failures: vec![crate::model::FailedServer {
                server: "b".to_string(),
                ip: Ipv4Addr::new(10, 0, 0, 2),
                error: "HTTP 503".to_string(),
            }],
        }
    }
}
