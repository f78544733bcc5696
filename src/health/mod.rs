// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health aggregation for monitored services.
//!
//! # Data Flow
//!
//! ```text
//! Service.bound_servers
//!     → resolve against Config.servers (unknown names are warnings)
//!     → one probe per resolved server, all concurrent
//!         - healthcheck_path set: HTTP(S) GET pinned to the server IP
//!         - otherwise:            TCP connect to (ip, port)
//!     → HealthReport (healthy names in configured order, failures, counts)
//! ```
//!
//! A probe is attempted exactly once per run. Transient failures are healed by
//! the next scheduled run, not by retrying in-process.

pub mod aggregator;
pub mod probe;

pub use aggregator::{
    check_all_services, check_service_health, resolve_bound_servers, ServiceHealth,
};
pub use probe::{HttpProbe, Probe, ProbeTarget, ServiceProbe, TcpProbe};
