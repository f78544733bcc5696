// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Newline-delimited JSON run log.
//!
//! Every run appends one `summary` line followed by one line per failed
//! server and per DNS event to a daily file under `logs/`.
//!
//! ```text
//! {"ts":"2025-03-01T12:00:00.000000Z","run":"123","type":"summary","data":[{"ts":"...","svc":"app","ok":2,"fail":1,"dns":"updated"}]}
//! {"type":"failure","ts":"...","svc":"app","server":"s1","ip":"10.0.0.1","error":"Port 443 closed"}
//! {"type":"dns_updated","ts":"...","svc":"app","host":"app.example.com","previous":[...],"current":[...],"removed":[...],"added":[...]}
//! ```

use crate::config::Config;
use crate::constants::{LOG_DIRECTORY, LOG_FILE_PREFIX, RUN_ID_ENV, UNKNOWN_RUN_ID};
use crate::model::ReconciliationStatus;
use crate::run::RunReport;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::net::Ipv4Addr;

/// Per-service entry of the summary line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub ts: String,
    pub svc: String,
    pub ok: usize,
    pub fail: usize,
    pub dns: Option<ReconciliationStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub ts: String,
    pub run: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: Vec<SummaryEntry>,
}

/// Detail line for a failure or DNS event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetailLine {
    Failure {
        ts: String,
        svc: String,
        server: String,
        ip: Ipv4Addr,
        error: String,
    },
    DnsMismatch {
        ts: String,
        svc: String,
        host: String,
        current_dns: Vec<Ipv4Addr>,
        healthy_ips: Vec<Ipv4Addr>,
        update_disabled: bool,
    },
    DnsUpdated {
        ts: String,
        svc: String,
        host: String,
        previous: Vec<Ipv4Addr>,
        current: Vec<Ipv4Addr>,
        removed: Vec<Ipv4Addr>,
        added: Vec<Ipv4Addr>,
    },
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Run identifier from the CI environment, or `unknown`.
#[must_use]
pub fn current_run_id() -> String {
    std::env::var(RUN_ID_ENV).unwrap_or_else(|_| UNKNOWN_RUN_ID.to_string())
}

/// Repository path of the daily log file, e.g. `logs/healthcheck-20250301.log`.
#[must_use]
pub fn log_path(now: DateTime<Utc>) -> String {
    format!(
        "{LOG_DIRECTORY}/{LOG_FILE_PREFIX}{}.log",
        now.format("%Y%m%d")
    )
}

/// Commit message for appending a run.
#[must_use]
pub fn commit_message(now: DateTime<Utc>) -> String {
    format!("Log healthcheck - {} UTC", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Summary and detail records for a run.
///
/// Services absent from the configuration are left out.
#[must_use]
pub fn build_log_records(
    config: &Config,
    report: &RunReport,
    run_id: &str,
    now: DateTime<Utc>,
) -> (SummaryLine, Vec<DetailLine>) {
    let ts = timestamp(now);
    let mut data = Vec::new();
    let mut details = Vec::new();

    for (name, health) in &report.health_results {
        let Some(service) = config.service(name) else {
            continue;
        };
        let dns = report.dns_results.get(name);

        data.push(SummaryEntry {
            ts: ts.clone(),
            svc: name.clone(),
            ok: health.healthy_count(),
            fail: health.failed_count,
            dns: dns.map(|d| d.status),
        });

        details.extend(health.failures.iter().map(|failed| DetailLine::Failure {
            ts: ts.clone(),
            svc: name.clone(),
            server: failed.server.clone(),
            ip: failed.ip,
            error: failed.error.clone(),
        }));

        let Some(dns) = dns else {
            continue;
        };
        let changes = &dns.changes;
        match dns.status {
            ReconciliationStatus::Mismatch | ReconciliationStatus::UpdateDisabled => {
                details.push(DetailLine::DnsMismatch {
                    ts: ts.clone(),
                    svc: name.clone(),
                    host: service.hostname.clone(),
                    current_dns: changes.previous.clone(),
                    healthy_ips: changes.target.clone(),
                    update_disabled: dns.status == ReconciliationStatus::UpdateDisabled,
                });
            }
            ReconciliationStatus::Updated => details.push(DetailLine::DnsUpdated {
                ts: ts.clone(),
                svc: name.clone(),
                host: service.hostname.clone(),
                previous: changes.previous.clone(),
                current: changes.target.clone(),
                removed: changes.removed.clone(),
                added: changes.added.clone(),
            }),
            ReconciliationStatus::InSync => {}
        }
    }

    let summary = SummaryLine {
        ts,
        run: run_id.to_string(),
        kind: "summary",
        data,
    };
    (summary, details)
}

/// Render a run as compact JSON lines, newline terminated.
///
/// # Errors
///
/// Returns an error if a record cannot be serialized.
pub fn build_log_lines(
    config: &Config,
    report: &RunReport,
    run_id: &str,
    now: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    let (summary, details) = build_log_records(config, report, run_id, now);

    let mut out = serde_json::to_string(&summary)?;
    out.push('\n');
    for detail in &details {
        out.push_str(&serde_json::to_string(detail)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
#[path = "run_log_tests.rs"]
mod run_log_tests;
