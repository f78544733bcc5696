// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for HTTP and TCP health probes.

#[cfg(test)]
mod tests {
    use crate::config::Scheme;
    use crate::errors::ProbeError;
    use crate::health::probe::{HttpProbe, Probe, ProbeTarget, ServiceProbe, TcpProbe};
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_rustls::TlsAcceptor;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_target(port: u16, health_path: &str) -> ProbeTarget {
        ProbeTarget {
            scheme: Scheme::Http,
            hostname: "app.test".to_string(),
            path: Some(health_path.to_string()),
            ip: Ipv4Addr::LOCALHOST,
            port,
        }
    }

    fn tcp_target(port: u16) -> ProbeTarget {
        ProbeTarget {
            scheme: Scheme::Http,
            hostname: "app.test".to_string(),
            path: None,
            ip: Ipv4Addr::LOCALHOST,
            port,
        }
    }

    // =====================================================
    // URL Building Tests
    // =====================================================

    #[test]
    fn test_url_omits_default_port() {
        let target = ProbeTarget {
            scheme: Scheme::Https,
            hostname: "app.example.com".to_string(),
            path: Some("/healthz".to_string()),
            ip: Ipv4Addr::new(203, 0, 113, 10),
            port: 443,
        };
        assert_eq!(target.url().unwrap().as_str(), "https://app.example.com/healthz");
    }

    #[test]
    fn test_url_keeps_custom_port() {
        let target = ProbeTarget {
            scheme: Scheme::Https,
            hostname: "app.example.com".to_string(),
            path: Some("/status?full=1".to_string()),
            ip: Ipv4Addr::new(203, 0, 113, 10),
            port: 8443,
        };
        assert_eq!(
            target.url().unwrap().as_str(),
            "https://app.example.com:8443/status?full=1"
        );
    }

    #[test]
    fn test_url_rejects_invalid_hostname() {
        let mut target = http_target(80, "/");
        target.hostname = "bad host".to_string();
        assert!(matches!(target.url(), Err(ProbeError::Request { .. })));
    }

    #[test]
    fn test_override_resolution_builds_client() {
        let probe = HttpProbe::new();
        assert!(probe
            .override_resolution(Scheme::Https, "app.example.com", 443, Ipv4Addr::new(10, 0, 0, 1))
            .is_ok());
    }

    // =====================================================
    // HTTP Probe Tests
    // =====================================================

    #[tokio::test]
    async fn test_http_probe_pins_hostname_to_ip() {
        let server = MockServer::start().await;
        let port = server.address().port();

        Mock::given(method("GET"))
            .and(path("/healthz"))
            .and(header("host", format!("app.test:{port}").as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = HttpProbe::new().probe(&http_target(port, "/healthz")).await;
        assert_eq!(result.unwrap(), "HTTP 200");
    }

    #[tokio::test]
    async fn test_http_probe_non_200_is_unhealthy() {
        let server = MockServer::start().await;
        let port = server.address().port();

        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = HttpProbe::new()
            .probe(&http_target(port, "/healthz"))
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::HttpStatus { status: 503 });
        assert_eq!(err.to_string(), "HTTP 503");
    }

    #[tokio::test]
    async fn test_http_probe_other_2xx_is_unhealthy() {
        let server = MockServer::start().await;
        let port = server.address().port();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let err = HttpProbe::new()
            .probe(&http_target(port, "/healthz"))
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::HttpStatus { status: 204 });
    }

    #[tokio::test]
    async fn test_http_probe_does_not_follow_redirects() {
        let server = MockServer::start().await;
        let port = server.address().port();

        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/elsewhere"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = HttpProbe::new()
            .probe(&http_target(port, "/healthz"))
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::HttpStatus { status: 301 });
    }

    #[tokio::test]
    async fn test_http_probe_timeout() {
        let server = MockServer::start().await;
        let port = server.address().port();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = HttpProbe::with_timeout(Duration::from_millis(200))
            .probe(&http_target(port, "/healthz"))
            .await
            .unwrap_err();
        assert_eq!(err, ProbeError::Timeout);
    }

    #[tokio::test]
    async fn test_http_probe_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = HttpProbe::new()
            .probe(&http_target(port, "/healthz"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Request { .. }));
    }

    // =====================================================
    // TCP Probe Tests
    // =====================================================

    #[tokio::test]
    async fn test_tcp_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let detail = TcpProbe::new().probe(&tcp_target(port)).await.unwrap();
        assert!(detail.starts_with(&format!("Port {port} open")));
    }

    #[tokio::test]
    async fn test_tcp_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpProbe::new().probe(&tcp_target(port)).await.unwrap_err();
        assert_eq!(err, ProbeError::PortClosed { port });
    }

    // =====================================================
    // Dispatch Tests
    // =====================================================

    #[tokio::test]
    async fn test_service_probe_uses_tcp_without_path() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let detail = ServiceProbe::new().probe(&tcp_target(port)).await.unwrap();
        assert!(detail.contains("open"));
    }

    #[tokio::test]
    async fn test_service_probe_uses_http_with_path() {
        let server = MockServer::start().await;
        let port = server.address().port();

        Mock::given(method("GET"))
            .and(path("/ready"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let detail = ServiceProbe::new()
            .probe(&http_target(port, "/ready"))
            .await
            .unwrap();
        assert_eq!(detail, "HTTP 200");
    }

    // =====================================================
    // HTTPS Probe Tests
    // =====================================================

    /// Serve one request over TLS with a self-signed certificate for
    /// `app.test`. Yields the SNI name and the raw request head.
    async fn self_signed_origin() -> (u16, JoinHandle<(Option<String>, String)>) {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["app.test".to_string()]).unwrap();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

        let config = rustls::ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut tls = acceptor.accept(stream).await.unwrap();
            let sni = tls.get_ref().1.server_name().map(ToString::to_string);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = tls.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            tls.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            let _ = tls.shutdown().await;
            (sni, String::from_utf8_lossy(&request).to_lowercase())
        });

        (port, handle)
    }

    #[tokio::test]
    async fn test_https_probe_accepts_self_signed_origin() {
        // Already installed is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
        let (port, origin) = self_signed_origin().await;

        let target = ProbeTarget {
            scheme: Scheme::Https,
            hostname: "app.test".to_string(),
            path: Some("/healthz".to_string()),
            ip: Ipv4Addr::LOCALHOST,
            port,
        };
        let result = HttpProbe::with_timeout(Duration::from_secs(5))
            .probe(&target)
            .await;
        assert_eq!(result.unwrap(), "HTTP 200");

        let (sni, request) = origin.await.unwrap();
        assert_eq!(sni.as_deref(), Some("app.test"));
        assert!(request.starts_with("get /healthz http/1.1"));
        assert!(request.contains(&format!("host: app.test:{port}")));
    }
}
