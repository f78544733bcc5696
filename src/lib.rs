// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ha-monitor - health-check driven DNS failover
//!
//! ha-monitor probes every server behind a set of named services, derives the
//! servers that should currently be advertised in DNS, and converges the DNS
//! provider's address records to that set.
//!
//! ## Overview
//!
//! A run is stateless: every invocation re-derives health and DNS state from
//! scratch, and the DNS provider is the only source of truth. Runs are meant
//! to be triggered periodically by an external scheduler.
//!
//! 1. **Probe** - HTTP(S) status check pinned to each server's IP, or a raw
//!    TCP connect when no health check path is configured
//! 2. **Aggregate** - one [`model::HealthReport`] per service
//! 3. **Reconcile** - diff healthy IPs against published `A` records and, when
//!    updates are enabled, issue the minimal create/delete batch
//! 4. **Report** - JSON results, workflow annotations, an append-only run log
//!
//! ## Modules
//!
//! - [`config`] - Run configuration (servers, services, provider, logging)
//! - [`health`] - Probes and the per-service health aggregator
//! - [`provider`] - DNS provider interface and the Cloudflare client
//! - [`reconcilers`] - DNS diff, classification and mutation
//! - [`run`] - Orchestration of one invocation and the run report
//! - [`annotations`] - Workflow warning annotations
//! - [`run_log`] / [`log_store`] - Run log lines and repository storage
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use ha_monitor::config::load_config;
//! use ha_monitor::health::ServiceProbe;
//! use ha_monitor::run::execute_health_checks;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config(Path::new(".github/ha-monitor-config.json")).await?;
//! let phase = execute_health_checks(&config, &ServiceProbe::default()).await;
//! for (service, report) in &phase.results {
//!     println!("{service}: {}/{} healthy", report.healthy_count(), report.total_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod annotations;
pub mod config;
pub mod constants;
pub mod errors;
pub mod health;
pub mod http_errors;
pub mod log_store;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod reconcilers;
pub mod run;
pub mod run_log;
pub mod status_reasons;
