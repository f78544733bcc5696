// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Server health probes.
//!
//! Two probe kinds exist:
//!
//! - [`HttpProbe`] requests `scheme://hostname[:port]/path` while pinning the
//!   resolution of `hostname` to the server's IP, so the Host header and TLS SNI
//!   carry the public hostname but the connection lands on one specific origin.
//!   Only status `200` is healthy.
//! - [`TcpProbe`] opens a TCP connection to `(ip, port)`.
//!
//! Both are bounded by [`PROBE_TIMEOUT_SECS`].

use crate::config::{Scheme, Server, Service};
use crate::constants::{HEALTHY_HTTP_STATUS, HTTP_USER_AGENT, PROBE_TIMEOUT_SECS};
use crate::errors::ProbeError;
use reqwest::{redirect::Policy, Client as HttpClient};
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use url::Url;

/// Everything a probe needs to know about one server of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub scheme: Scheme,
    pub hostname: String,
    /// HTTP health path; `None` selects a TCP probe
    pub path: Option<String>,
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl ProbeTarget {
    /// Build the probe target for `server` as a backend of `service`.
    #[must_use]
    pub fn for_server(service: &Service, server: &Server) -> Self {
        Self {
            scheme: service.scheme,
            hostname: service.hostname.clone(),
            path: service.healthcheck_path.clone(),
            ip: server.ip,
            port: service.effective_port(),
        }
    }

    /// URL requested by the HTTP probe.
    ///
    /// The port is only spelled out when it differs from the scheme default.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Request`] if hostname and path do not form a valid URL.
    pub fn url(&self) -> Result<Url, ProbeError> {
        let path = self.path.as_deref().unwrap_or("/");
        let raw = if self.port == self.scheme.default_port() {
            format!("{}://{}{}", self.scheme, self.hostname, path)
        } else {
            format!("{}://{}:{}{}", self.scheme, self.hostname, self.port, path)
        };
        Url::parse(&raw).map_err(|e| ProbeError::Request {
            reason: format!("invalid health check URL '{raw}': {e}"),
        })
    }
}

/// A liveness check for one server.
///
/// `Ok` carries a short human-readable success detail; `Err` the reason the
/// server is considered unhealthy.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &ProbeTarget) -> Result<String, ProbeError>;
}

/// HTTP(S) status probe with pinned resolution.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build a client that resolves `hostname` to `ip:port` and nothing else.
    ///
    /// Certificate validation is disabled for `https` because origins are
    /// addressed directly and commonly carry self-signed or internal
    /// certificates. Redirects are not followed: only a direct `200` counts.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Request`] if the client cannot be built.
    pub fn override_resolution(
        &self,
        scheme: Scheme,
        hostname: &str,
        port: u16,
        ip: Ipv4Addr,
    ) -> Result<HttpClient, ProbeError> {
        HttpClient::builder()
            .resolve(hostname, SocketAddr::new(ip.into(), port))
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .danger_accept_invalid_certs(scheme == Scheme::Https)
            .redirect(Policy::none())
            .no_proxy()
            .user_agent(HTTP_USER_AGENT)
            .build()
            .map_err(|e| ProbeError::Request {
                reason: describe_error(&e),
            })
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, target: &ProbeTarget) -> Result<String, ProbeError> {
        let url = target.url()?;
        let client =
            self.override_resolution(target.scheme, &target.hostname, target.port, target.ip)?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Request {
                    reason: describe_error(&e),
                }
            }
        })?;

        let status = response.status().as_u16();
        if status == HEALTHY_HTTP_STATUS {
            Ok(format!("HTTP {status}"))
        } else {
            Err(ProbeError::HttpStatus { status })
        }
    }
}

/// TCP connect probe.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, target: &ProbeTarget) -> Result<String, ProbeError> {
        let addr = SocketAddr::new(target.ip.into(), target.port);
        let started = Instant::now();

        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => Ok(format!(
                "Port {} open ({:.2}s)",
                target.port,
                started.elapsed().as_secs_f64()
            )),
            Ok(Err(e))
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset
                ) =>
            {
                Err(ProbeError::PortClosed { port: target.port })
            }
            Ok(Err(e)) if e.kind() == ErrorKind::TimedOut => Err(ProbeError::Timeout),
            Ok(Err(e)) => Err(ProbeError::Connect {
                ip: target.ip,
                port: target.port,
                reason: e.to_string(),
            }),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

/// Probe that picks HTTP or TCP from the target.
#[derive(Debug, Clone, Default)]
pub struct ServiceProbe {
    http: HttpProbe,
    tcp: TcpProbe,
}

impl ServiceProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: HttpProbe::with_timeout(timeout),
            tcp: TcpProbe::with_timeout(timeout),
        }
    }
}

#[async_trait::async_trait]
impl Probe for ServiceProbe {
    async fn probe(&self, target: &ProbeTarget) -> Result<String, ProbeError> {
        if target.path.is_some() {
            self.http.probe(target).await
        } else {
            self.tcp.probe(target).await
        }
    }
}

/// Flatten an error and its sources into one line.
fn describe_error(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod probe_tests;
