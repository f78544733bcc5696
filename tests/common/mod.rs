// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests

#![allow(dead_code)]

use ha_monitor::config::{Config, ProviderSettings, Scheme, Server, Service, ServiceDnsSettings};
use ha_monitor::errors::ProviderSetupError;
use ha_monitor::provider::{CloudflareClient, DnsProvider};
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ZONE_ID: &str = "zone-e2e";

pub fn server(name: &str, ip: Ipv4Addr) -> Server {
    Server {
        name: name.to_string(),
        ip,
    }
}

/// TCP-checked service bound to `servers` on `port`.
pub fn tcp_service(name: &str, port: u16, servers: &[&str], update_dns: bool) -> Service {
    Service {
        name: name.to_string(),
        hostname: format!("{name}.example.test"),
        scheme: Scheme::Http,
        port: Some(port),
        healthcheck_path: None,
        bound_servers: servers.iter().map(ToString::to_string).collect(),
        dns: Some(ServiceDnsSettings {
            zone_id: Some(ZONE_ID.to_string()),
            update_dns,
            ttl: 120,
            proxied: false,
        }),
    }
}

pub fn config(servers: Vec<Server>, services: Vec<Service>, api_base: &str) -> Config {
    Config {
        servers,
        services,
        cloudflare: ProviderSettings {
            enabled: true,
            api_base: api_base.to_string(),
            ..ProviderSettings::default()
        },
        ..Config::default()
    }
}

/// Listener accepting connections on 127.0.0.1 for the lifetime of the test.
pub async fn open_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Cloudflare listing body holding one `A` record per address.
pub fn record_listing(hostname: &str, ips: &[&str]) -> Value {
    let result: Vec<Value> = ips
        .iter()
        .enumerate()
        .map(|(i, ip)| {
            json!({
                "id": format!("rec-{i}"),
                "type": "A",
                "name": hostname,
                "content": ip,
                "ttl": 120,
                "proxied": false
            })
        })
        .collect();
    json!({
        "success": true,
        "errors": [],
        "result": result,
        "result_info": {"page": 1, "per_page": 100, "total_pages": 1}
    })
}

/// Mount a record listing for the test zone.
pub async fn mount_listing(mock: &MockServer, hostname: &str, ips: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/zones/{ZONE_ID}/dns_records")))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_listing(hostname, ips)))
        .mount(mock)
        .await;
}

/// Connector for a Cloudflare client pointed at `api_base`.
pub fn connector(
    api_base: String,
) -> impl FnOnce() -> Result<Arc<dyn DnsProvider>, ProviderSetupError> {
    move || {
        let client = CloudflareClient::new(&api_base, "integration-token")?;
        Ok(Arc::new(client) as Arc<dyn DnsProvider>)
    }
}
