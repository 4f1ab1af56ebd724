use std::collections::BTreeSet;
use std::net::IpAddr;

use rcgen::{
    BasicConstraints,
    CertificateParams,
    DnType,
    IsCa,
    Issuer,
    KeyPair,
    SanType,
};
use time::{
    Duration,
    OffsetDateTime,
};

use crate::error::Error;

const CA_VALIDITY_DAYS: i64 = 365 * 10;
const CERT_VALIDITY_DAYS: i64 = 365;

/// A certificate issued by an [`Authority`]: the PEM chain entries (leaf
/// first) and the matching private key.
#[derive(Debug)]
pub struct IssuedCertificate {
    pub chain_pem: Vec<String>,
    pub private_key_pem: String,
}

/// The signing authority shared by every self-signed issuance in a run.
///
/// Either minted fresh in memory or loaded from an existing certificate and
/// key pair on disk. Read-only once constructed.
pub struct Authority {
    params: CertificateParams,
    key_pair: KeyPair,
    cert_pem: String,
}

impl Authority {
    /// Mints a new in-memory authority scoped to the given organization and
    /// unit. Nothing is written to disk here.
    pub fn create(organization: &str, unit: &str) -> Result<Self, Error> {
        let params = Self::build_ca_params(organization, unit);
        let key_pair = KeyPair::generate()?;
        let cert = params.self_signed(&key_pair)?;
        let cert_pem = cert.pem();

        Ok(Self {
            params,
            key_pair,
            cert_pem,
        })
    }

    /// Reuses an authority persisted as a PEM certificate and key pair.
    ///
    /// The certificate bytes are kept verbatim and written back out as-is;
    /// signing uses the loaded key under subject params rebuilt from the
    /// configured organization and unit.
    pub fn load_from_pem(
        cert_pem: &str, key_pem: &str, organization: &str, unit: &str,
    ) -> Result<Self, Error> {
        let parsed = pem::parse(cert_pem)
            .map_err(|e| Error::Authority(format!("invalid CA certificate PEM: {e}")))?;
        if parsed.tag() != "CERTIFICATE" {
            return Err(Error::Authority(format!(
                "expected a CERTIFICATE PEM block, found {}",
                parsed.tag()
            )));
        }

        let key_pair = KeyPair::from_pem(key_pem)
            .map_err(|e| Error::Authority(format!("invalid CA private key PEM: {e}")))?;
        let params = Self::build_ca_params(organization, unit);

        Ok(Self {
            params,
            key_pair,
            cert_pem: cert_pem.to_string(),
        })
    }

    /// The authority's own certificate in PEM form.
    pub fn certificate_pem(&self) -> &str {
        &self.cert_pem
    }

    /// Issues a certificate for the given identity set, signed by this
    /// authority. Identities that parse as IP addresses become IP subject
    /// alternative names; everything else is a DNS name.
    pub fn issue_certificate(
        &self, identities: &BTreeSet<String>, organization: Option<&str>, unit: Option<&str>,
    ) -> Result<IssuedCertificate, Error> {
        if identities.is_empty() {
            return Err(Error::Config(
                "a certificate requires at least one identity".to_string(),
            ));
        }

        let mut params = CertificateParams::default();
        for identity in identities {
            let san = match identity.parse::<IpAddr>() {
                Ok(addr) => SanType::IpAddress(addr),
                Err(_) => SanType::DnsName(
                    identity
                        .as_str()
                        .try_into()
                        .map_err(|_| Error::Config(format!("invalid identity {identity:?}")))?,
                ),
            };
            params.subject_alt_names.push(san);
        }

        if let Some(common_name) = identities.iter().next() {
            params
                .distinguished_name
                .push(DnType::CommonName, common_name.as_str());
        }
        if let Some(organization) = organization {
            params
                .distinguished_name
                .push(DnType::OrganizationName, organization);
        }
        if let Some(unit) = unit {
            params
                .distinguished_name
                .push(DnType::OrganizationalUnitName, unit);
        }

        let now = OffsetDateTime::now_utc();
        params.not_before = now - Duration::minutes(1);
        params.not_after = now + Duration::days(CERT_VALIDITY_DAYS);

        let key_pair = KeyPair::generate()?;
        let signer = Issuer::from_params(&self.params, &self.key_pair);
        let cert = params.signed_by(&key_pair, &signer)?;

        Ok(IssuedCertificate {
            chain_pem: vec![cert.pem()],
            private_key_pem: key_pair.serialize_pem(),
        })
    }

    fn build_ca_params(organization: &str, unit: &str) -> CertificateParams {
        let mut params = CertificateParams::default();

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, format!("{organization} Local CA"));
        params
            .distinguished_name
            .push(DnType::OrganizationName, organization);
        params
            .distinguished_name
            .push(DnType::OrganizationalUnitName, unit);

        let now = OffsetDateTime::now_utc();
        params.not_before = now - Duration::minutes(1);
        params.not_after = now + Duration::days(CA_VALIDITY_DAYS);

        params
    }
}
