// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Workflow warning annotations.
//!
//! CI runners pick up lines of the form `::warning title=<title>::<message>`
//! on stdout and surface them on the run summary.

use crate::model::{DnsReport, ReconciliationStatus};
use crate::run::{Diagnostic, RunReport};
use crate::status_reasons::{
    REASON_CONFIGURATION_INVALID, REASON_LOG_SHIPPING_FAILED, REASON_MUTATION_FAILED,
    REASON_NO_HEALTHY_SERVERS,
};
use std::net::Ipv4Addr;

pub const TITLE_DNS_STATE_MISMATCH: &str = "DNS State Mismatch";
pub const TITLE_DNS_UPDATES_DISABLED: &str = "DNS Updates Disabled";
pub const TITLE_NO_HEALTHY_SERVERS: &str = "No Healthy Servers";
pub const TITLE_DNS_UPDATE_FAILED: &str = "DNS Update Failed";
pub const TITLE_DNS_PROVIDER_ERROR: &str = "DNS Provider Error";
pub const TITLE_CONFIGURATION: &str = "Configuration Warning";
pub const TITLE_LOG_SHIPPING: &str = "Log Shipping Failed";

/// Format one annotation line.
///
/// Newlines would end the annotation early, so they are escaped the way the
/// runner expects.
#[must_use]
pub fn warning(title: &str, message: &str) -> String {
    format!("::warning title={}::{}", escape(title), escape(message))
}

fn escape(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn join_ips(ips: &[Ipv4Addr]) -> String {
    ips.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Annotations for one DNS result.
///
/// Any drift yields a mismatch warning; drift with updates disabled also
/// yields an updates-disabled warning.
#[must_use]
pub fn dns_annotations(hostname: &str, report: &DnsReport) -> Vec<String> {
    if report.status == ReconciliationStatus::InSync {
        return Vec::new();
    }

    let mut lines = vec![warning(
        TITLE_DNS_STATE_MISMATCH,
        &format!(
            "DNS mismatch for {hostname}: Current [{}] != Healthy [{}]",
            join_ips(&report.changes.previous),
            join_ips(&report.changes.target)
        ),
    )];
    if report.status == ReconciliationStatus::UpdateDisabled {
        lines.push(warning(
            TITLE_DNS_UPDATES_DISABLED,
            &format!("DNS mismatch for {hostname} but update_dns is false"),
        ));
    }
    lines
}

fn diagnostic_title(diagnostic: &Diagnostic) -> &'static str {
    match diagnostic.reason.as_str() {
        REASON_NO_HEALTHY_SERVERS => TITLE_NO_HEALTHY_SERVERS,
        REASON_MUTATION_FAILED => TITLE_DNS_UPDATE_FAILED,
        REASON_CONFIGURATION_INVALID => TITLE_CONFIGURATION,
        REASON_LOG_SHIPPING_FAILED => TITLE_LOG_SHIPPING,
        _ => TITLE_DNS_PROVIDER_ERROR,
    }
}

/// Every annotation for a run, DNS results first, then diagnostics.
///
/// `hostname_of` maps a service name to its hostname.
#[must_use]
pub fn run_annotations<'a>(
    report: &RunReport,
    hostname_of: impl Fn(&str) -> Option<&'a str>,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (service, dns) in &report.dns_results {
        let hostname = hostname_of(service).unwrap_or(service.as_str());
        lines.extend(dns_annotations(hostname, dns));
    }
    lines.extend(
        report
            .diagnostics
            .iter()
            .map(|d| warning(diagnostic_title(d), &d.message)),
    );
    lines
}

#[cfg(test)]
#[path = "annotations_tests.rs"]
mod annotations_tests;
