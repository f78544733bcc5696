// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS reconciliation.
//!
//! Compares the addresses of healthy servers with the address records the DNS
//! provider publishes for a service, and converges the provider when updates
//! are enabled.
//!
//! # Example
//!
//! ```rust,no_run
//! use ha_monitor::config::{DnsBinding, Server, Service};
//! use ha_monitor::model::HealthReport;
//! use ha_monitor::provider::CloudflareClient;
//! use ha_monitor::reconcilers::{reconcile_service, ReconcileMode};
//!
//! async fn converge(
//!     service: &Service,
//!     binding: &DnsBinding,
//!     report: &HealthReport,
//!     servers: &[Server],
//! ) -> anyhow::Result<()> {
//!     let client = CloudflareClient::new("https://api.cloudflare.com/client/v4", "token")?;
//!     let result =
//!         reconcile_service(&client, service, binding, report, servers, ReconcileMode::Apply)
//!             .await?;
//!     println!("{}: {}", service.name, result.status);
//!     Ok(())
//! }
//! ```

pub mod dns;

pub use dns::{classify, desired_ips, published_ips, reconcile_service, ReconcileMode};
