//! Certificate authority for ingress TLS
//!
//! Every ingress secret gets its own freshly generated CA and a leaf
//! certificate for the ingress host signed by it. The CA private key never
//! leaves the process; only the leaf key, leaf certificate and CA
//! certificate are written into the secret.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use rand::RngCore;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
    PKCS_ECDSA_P256_SHA256,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::OperatorConfig;
use crate::crd::Jira;
use crate::error::{Error, Result};

/// Secret key holding the PEM-encoded leaf private key
pub const TLS_KEY: &str = "tls.key";
/// Secret key holding the PEM-encoded leaf certificate
pub const TLS_CERT: &str = "tls.crt";
/// Secret key holding the PEM-encoded CA certificate
pub const CA_CERT: &str = "ca.crt";

const CA_VALIDITY_DAYS: i64 = 3650;
const LEAF_VALIDITY_DAYS: i64 = 365;

/// Subject of a leaf certificate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertConfig {
    pub common_name: String,
    pub organization: String,
    /// DNS names or IP addresses the certificate is valid for
    pub alt_names: Vec<String>,
}

/// Self-signed certificate authority held in memory only
pub struct CertificateAuthority {
    key: KeyPair,
    cert: Certificate,
}

impl CertificateAuthority {
    pub fn certificate_pem(&self) -> String {
        self.cert.pem()
    }

    pub fn certificate_der(&self) -> &[u8] {
        self.cert.der()
    }

    pub fn key_pem(&self) -> String {
        self.key.serialize_pem()
    }
}

/// End-entity certificate and its private key
pub struct LeafCertificate {
    key: KeyPair,
    cert: Certificate,
}

impl LeafCertificate {
    pub fn certificate_pem(&self) -> String {
        self.cert.pem()
    }

    pub fn certificate_der(&self) -> &[u8] {
        self.cert.der()
    }

    pub fn key_pem(&self) -> String {
        self.key.serialize_pem()
    }
}

/// PEM material written into an ingress TLS secret
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsBundle {
    pub key_pem: String,
    pub certificate_pem: String,
    pub ca_certificate_pem: String,
}

impl TlsBundle {
    pub fn into_secret_data(self) -> BTreeMap<String, ByteString> {
        BTreeMap::from([
            (TLS_KEY.to_string(), ByteString(self.key_pem.into_bytes())),
            (
                TLS_CERT.to_string(),
                ByteString(self.certificate_pem.into_bytes()),
            ),
            (
                CA_CERT.to_string(),
                ByteString(self.ca_certificate_pem.into_bytes()),
            ),
        ])
    }
}

fn random_serial() -> SerialNumber {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    // DER integers are signed; keep the serial positive and non-zero
    bytes[0] &= 0x7f;
    bytes[0] |= 0x01;
    SerialNumber::from(bytes.to_vec())
}

fn distinguished_name(common_name: &str, organization: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    if !organization.is_empty() {
        dn.push(DnType::OrganizationName, organization);
    }
    dn
}

/// Generate a new self-signed certificate authority
pub fn new_ca(config: &OperatorConfig) -> Result<CertificateAuthority> {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;

    let now = OffsetDateTime::now_utc();
    let mut params = CertificateParams::default();
    params.distinguished_name =
        distinguished_name(&config.ca_common_name, &config.tls_organization);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params.serial_number = Some(random_serial());
    params.not_before = now;
    params.not_after = now + Duration::days(CA_VALIDITY_DAYS);

    let cert = params.self_signed(&key)?;
    debug!("Generated CA {}", config.ca_common_name);
    Ok(CertificateAuthority { key, cert })
}

/// Issue a leaf certificate for `config` signed by `ca`
pub fn new_leaf_cert(ca: &CertificateAuthority, config: &CertConfig) -> Result<LeafCertificate> {
    if config.common_name.is_empty() {
        return Err(Error::InvalidInput(
            "certificate common name must not be empty".to_string(),
        ));
    }

    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;

    let now = OffsetDateTime::now_utc();
    let mut params = CertificateParams::new(config.alt_names.clone())?;
    params.distinguished_name = distinguished_name(&config.common_name, &config.organization);
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];
    params.use_authority_key_identifier_extension = true;
    params.serial_number = Some(random_serial());
    params.not_before = now;
    params.not_after = now + Duration::days(LEAF_VALIDITY_DAYS);

    let cert = params.signed_by(&key, &ca.cert, &ca.key)?;
    debug!("Issued certificate for {}", config.common_name);
    Ok(LeafCertificate { key, cert })
}

/// Mint the CA and leaf certificate for a Jira ingress host
pub fn ingress_tls_bundle(jira: &Jira, config: &OperatorConfig) -> Result<TlsBundle> {
    let host = jira
        .spec
        .ingress
        .as_ref()
        .map(|ingress| ingress.host.clone())
        .filter(|host| !host.is_empty())
        .ok_or_else(|| Error::InvalidInput("ingress TLS requires an ingress host".to_string()))?;

    let ca = new_ca(config)?;
    let leaf = new_leaf_cert(
        &ca,
        &CertConfig {
            common_name: host.clone(),
            organization: config.tls_organization.clone(),
            alt_names: vec![host],
        },
    )?;

    Ok(TlsBundle {
        key_pem: leaf.key_pem(),
        certificate_pem: leaf.certificate_pem(),
        ca_certificate_pem: ca.certificate_pem(),
    })
}
