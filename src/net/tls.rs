//! TLS identity provisioning.
//!
//! # Responsibilities
//! - Load an operator-supplied certificate/key pair
//! - Otherwise generate a self-signed certificate for this host
//! - Describe the certificate that is actually served
//!
//! # Design Decisions
//! - Both files present means the operator wants a fixed identity; any
//!   problem loading them is fatal
//! - Generated material is serialized to PEM and loaded back through the
//!   same path as operator files

use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SerialNumber,
};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use x509_parser::extensions::GeneralName;

use crate::platform::host::local_hostname;

/// Organization placed in generated certificate subjects.
pub const ORGANIZATION: &str = "Request Echo";

/// RSA modulus size for generated keys.
pub const KEY_BITS: usize = 2048;

/// Lifetime of generated certificates.
pub const VALIDITY_DAYS: i64 = 365;

/// Errors that prevent a secure listener from starting.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("no certificate found in PEM data")]
    MissingCertificate,
    #[error("no private key found in PEM data")]
    MissingKey,
    #[error("invalid PEM data: {0}")]
    Pem(std::io::Error),
    #[error("certificate and key do not form a usable pair: {0}")]
    KeyPair(#[from] rustls::Error),
    #[error("failed to parse certificate: {0}")]
    Parse(String),
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("certificate generation failed: {0}")]
    Generation(#[from] rcgen::Error),
}

/// Where the served certificate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateSource {
    Loaded,
    Generated,
}

/// Metadata of the served certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDescriptor {
    pub subject: String,
    pub issuer: String,
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub not_after: OffsetDateTime,
    /// Decimal serial number.
    pub serial_number: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    pub enabled: bool,
}

/// A PEM certificate chain and private key that load into rustls.
#[derive(Clone)]
pub struct Certificate {
    pub cert_pem: String,
    pub key_pem: String,
    pub source: CertificateSource,
    server_config: Arc<rustls::ServerConfig>,
    descriptor: CertificateDescriptor,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("source", &self.source)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl Certificate {
    /// Build from PEM text, validating that the key matches.
    pub fn from_pem(cert_pem: String, key_pem: String, source: CertificateSource) -> Result<Self, TlsError> {
        let certs = rustls_pemfile::certs(&mut BufReader::new(cert_pem.as_bytes()))
            .collect::<Result<Vec<CertificateDer<'static>>, _>>()
            .map_err(TlsError::Pem)?;
        let leaf = certs.first().ok_or(TlsError::MissingCertificate)?;
        let descriptor = describe(leaf)?;

        let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut BufReader::new(key_pem.as_bytes()))
            .map_err(TlsError::Pem)?
            .ok_or(TlsError::MissingKey)?;

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let mut server_config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(Self {
            cert_pem,
            key_pem,
            source,
            server_config: Arc::new(server_config),
            descriptor,
        })
    }

    pub fn descriptor(&self) -> &CertificateDescriptor {
        &self.descriptor
    }

    /// Listener configuration for `axum-server`.
    pub fn rustls_config(&self) -> RustlsConfig {
        RustlsConfig::from_config(self.server_config.clone())
    }
}

/// Load the configured pair, or generate a self-signed certificate when the
/// pair is not fully present.
pub async fn obtain_certificate(cert_path: &Path, key_path: &Path) -> Result<Certificate, TlsError> {
    let certificate = if cert_path.exists() && key_path.exists() {
        tracing::info!(cert = ?cert_path, key = ?key_path, "Loading TLS certificate from files");
        let cert_pem = read(cert_path).await?;
        let key_pem = read(key_path).await?;
        Certificate::from_pem(cert_pem, key_pem, CertificateSource::Loaded)?
    } else {
        tracing::info!(cert = ?cert_path, key = ?key_path, "Certificate files not found, generating self-signed certificate");
        let hostname = local_hostname();
        tokio::task::spawn_blocking(move || generate_self_signed(&hostname))
            .await
            .map_err(|e| TlsError::KeyGeneration(e.to_string()))??
    };

    log_certificate(certificate.descriptor());
    Ok(certificate)
}

async fn read(path: &Path) -> Result<String, TlsError> {
    tokio::fs::read_to_string(path).await.map_err(|source| TlsError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Generate a self-signed server certificate for `hostname`.
pub fn generate_self_signed(hostname: &str) -> Result<Certificate, TlsError> {
    let mut rng = rand::thread_rng();
    let private_key =
        RsaPrivateKey::new(&mut rng, KEY_BITS).map_err(|e| TlsError::KeyGeneration(e.to_string()))?;
    let key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| TlsError::KeyGeneration(e.to_string()))?
        .as_str()
        .to_string();
    let key_pair = KeyPair::from_pem(&key_pem)?;

    let mut dns_names = vec![hostname.to_string()];
    if hostname != "localhost" {
        dns_names.push("localhost".to_string());
    }

    let mut params = CertificateParams::new(dns_names)?;
    params.serial_number = Some(random_serial(&mut rng));
    params.not_before = OffsetDateTime::now_utc();
    params.not_after = params.not_before + Duration::days(VALIDITY_DAYS);
    params.distinguished_name = distinguished_name(hostname);
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyEncipherment];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let cert = params.self_signed(&key_pair)?;
    Certificate::from_pem(cert.pem(), key_pem, CertificateSource::Generated)
}

/// 128 random bits with the sign bit cleared and a non-zero leading byte,
/// so the DER integer is positive and minimally encoded.
fn random_serial(rng: &mut impl rand::RngCore) -> SerialNumber {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[0] = (bytes[0] & 0x7f).max(1);
    SerialNumber::from(bytes.to_vec())
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut name = DistinguishedName::new();
    name.push(DnType::OrganizationName, ORGANIZATION);
    name.push(DnType::CommonName, common_name);
    name
}

fn describe(der: &CertificateDer<'_>) -> Result<CertificateDescriptor, TlsError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der.as_ref())
        .map_err(|e| TlsError::Parse(e.to_string()))?;

    let dns_names = match cert.subject_alternative_name() {
        Ok(Some(san)) => san
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some(dns.to_string()),
                _ => None,
            })
            .collect(),
        Ok(None) => Vec::new(),
        Err(e) => return Err(TlsError::Parse(e.to_string())),
    };

    Ok(CertificateDescriptor {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before: cert.validity().not_before.to_datetime(),
        not_after: cert.validity().not_after.to_datetime(),
        serial_number: cert.serial.to_string(),
        dns_names,
        enabled: true,
    })
}

fn log_certificate(descriptor: &CertificateDescriptor) {
    tracing::info!(
        subject = %descriptor.subject,
        issuer = %descriptor.issuer,
        not_before = %descriptor.not_before,
        not_after = %descriptor.not_after,
        serial = %descriptor.serial_number,
        dns_names = ?descriptor.dns_names,
        "TLS certificate ready"
    );
}
