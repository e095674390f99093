//! TLS introspection for the fetched page. reqwest never exposes the peer
//! certificate, so a second handshake is made with a capture-only verifier
//! that accepts anything; the leaf is then parsed and judged offline. The
//! chain is never trusted here, only observed.

use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::warn;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use entropia_common::TlsInfo;

/// Capture the TLS details of `host:port`. Returns None when the handshake
/// cannot complete at all (connection refused, not TLS, timeout).
pub async fn capture_tls_info(host: &str, port: u16, timeout: Duration) -> Option<TlsInfo> {
    match tokio::time::timeout(timeout, handshake(host, port)).await {
        Ok(Ok(info)) => Some(info),
        Ok(Err(e)) => {
            warn!(host, port, error = %e, "TLS introspection failed");
            None
        }
        Err(_) => {
            warn!(host, port, "TLS introspection timed out");
            None
        }
    }
}

async fn handshake(host: &str, port: u16) -> Result<TlsInfo, Box<dyn std::error::Error + Send + Sync>> {
    let tcp = TcpStream::connect((host, port)).await?;

    // Pin the provider explicitly so the build never depends on a
    // process-default being installed.
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(CaptureVerifier::default()))
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(host.to_string())?;
    let stream = connector.connect(server_name, tcp).await?;
    let (_, connection) = stream.get_ref();

    let version = connection
        .protocol_version()
        .map(version_name)
        .unwrap_or_default();

    let mut info = TlsInfo {
        enabled: true,
        version,
        ..Default::default()
    };

    if let Some(certs) = connection.peer_certificates() {
        if let Some(leaf) = certs.first() {
            describe_leaf(leaf.as_ref(), host, &mut info);
        }
    }

    Ok(info)
}

/// Fill certificate-derived fields from the DER-encoded leaf.
fn describe_leaf(der: &[u8], host: &str, info: &mut TlsInfo) {
    let Ok((_, cert)) = X509Certificate::from_der(der) else {
        warn!(host, "Unparseable leaf certificate");
        return;
    };

    info.subject = cert.subject().to_string();
    info.issuer = cert.issuer().to_string();

    let validity = cert.validity();
    info.not_before = format_asn1_date(&validity.not_before);
    info.not_after = format_asn1_date(&validity.not_after);

    let now = chrono::Utc::now().timestamp();
    info.expired = now < validity.not_before.timestamp() || now > validity.not_after.timestamp();

    info.self_signed = info.subject == info.issuer;

    info.dns_names = subject_alt_names(&cert);
    info.domain_mismatch = !info
        .dns_names
        .iter()
        .any(|name| host_matches_pattern(host, name));
}

fn subject_alt_names(cert: &X509Certificate<'_>) -> Vec<String> {
    let Ok(Some(san)) = cert.subject_alternative_name() else {
        return Vec::new();
    };
    san.value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some(dns.to_string()),
            _ => None,
        })
        .collect()
}

/// DNS name matching per standard verification: exact, or a single `*.`
/// wildcard covering exactly one leftmost label.
pub fn host_matches_pattern(host: &str, pattern: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    if let Some(suffix) = pattern.strip_prefix("*.") {
        return match host.split_once('.') {
            Some((label, tail)) => !label.is_empty() && tail == suffix,
            None => false,
        };
    }

    host == pattern
}

fn format_asn1_date(time: &x509_parser::time::ASN1Time) -> String {
    let dt = time.to_datetime();
    format!("{:04}-{:02}-{:02}", dt.year(), dt.month() as u8, dt.day())
}

fn version_name(version: rustls::ProtocolVersion) -> String {
    match version {
        rustls::ProtocolVersion::TLSv1_2 => "TLS 1.2".to_string(),
        rustls::ProtocolVersion::TLSv1_3 => "TLS 1.3".to_string(),
        other => format!("{other:?}"),
    }
}

/// Accepts every certificate so the chain can be observed even when invalid.
#[derive(Debug)]
struct CaptureVerifier {
    provider: rustls::crypto::CryptoProvider,
}

impl Default for CaptureVerifier {
    fn default() -> Self {
        CaptureVerifier {
            provider: rustls::crypto::ring::default_provider(),
        }
    }
}

impl ServerCertVerifier for CaptureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_host_match() {
        assert!(host_matches_pattern("example.com", "example.com"));
        assert!(host_matches_pattern("EXAMPLE.com", "example.COM"));
        assert!(!host_matches_pattern("example.com", "example.org"));
    }

    #[test]
    fn wildcard_covers_single_label() {
        assert!(host_matches_pattern("www.example.com", "*.example.com"));
        assert!(host_matches_pattern("api.example.com", "*.example.com"));
        assert!(!host_matches_pattern("example.com", "*.example.com"));
        assert!(!host_matches_pattern("a.b.example.com", "*.example.com"));
    }

    #[test]
    fn wildcard_requires_nonempty_label() {
        assert!(!host_matches_pattern(".example.com", "*.example.com"));
    }
}
