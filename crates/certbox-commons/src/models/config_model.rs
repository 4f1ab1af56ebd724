use std::collections::{
    BTreeMap,
    BTreeSet,
};
use std::path::PathBuf;

use serde::de::{
    self,
    Deserializer,
};
use serde::Deserialize;

fn default_organization() -> String {
    "certbox".to_string()
}

fn default_unit() -> String {
    "certbox".to_string()
}

fn default_identities() -> BTreeSet<String> {
    ["127.0.0.1", "localhost", "*.localhost"]
        .iter()
        .map(|identity| identity.to_string())
        .collect()
}

fn default_ca_file() -> String {
    "ca.pem".to_string()
}

fn default_cert_file() -> String {
    "cert.pem".to_string()
}

fn default_key_file() -> String {
    "key.pem".to_string()
}

fn default_client_cert_file() -> String {
    "client.cert.pem".to_string()
}

fn default_client_key_file() -> String {
    "client.key.pem".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

/// Top-level configuration: where certificates land, the authority to sign
/// them with, and one request entry per named service.
///
/// Fields accept both snake_case and camelCase spellings so configs written
/// for either convention load unchanged.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub path: PathBuf,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default, alias = "caCert")]
    pub ca_cert: Option<PathBuf>,
    #[serde(default, alias = "caKey")]
    pub ca_key: Option<PathBuf>,
    #[serde(default)]
    pub certs: BTreeMap<String, CertRequest>,
    #[serde(default = "default_identities", alias = "defaultIdentities")]
    pub default_identities: BTreeSet<String>,
    #[serde(default = "default_ca_file", alias = "defaultCaFile")]
    pub default_ca_file: String,
    #[serde(default = "default_cert_file", alias = "defaultCertFile")]
    pub default_cert_file: String,
    #[serde(default = "default_key_file", alias = "defaultKeyFile")]
    pub default_key_file: String,
    #[serde(default = "default_client_cert_file", alias = "defaultClientCertFile")]
    pub default_client_cert_file: String,
    #[serde(default = "default_client_key_file", alias = "defaultClientKeyFile")]
    pub default_client_key_file: String,
    #[serde(default = "default_fetch_timeout_secs", alias = "fetchTimeoutSecs")]
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            path: PathBuf::from("certs"),
            organization: default_organization(),
            unit: default_unit(),
            ca_cert: None,
            ca_key: None,
            certs: BTreeMap::new(),
            default_identities: default_identities(),
            default_ca_file: default_ca_file(),
            default_cert_file: default_cert_file(),
            default_key_file: default_key_file(),
            default_client_cert_file: default_client_cert_file(),
            default_client_key_file: default_client_key_file(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// One certificate request, discriminated by its `type` field.
///
/// An unrecognized `type` deserializes into `Unknown` rather than failing the
/// whole config, so the orchestrator can report it against the one service it
/// belongs to and keep going.
#[derive(Clone, Debug, PartialEq)]
pub enum CertRequest {
    SelfSigned(SelfSignedRequest),
    TraefikMe(TraefikMeRequest),
    Unknown(String),
}

impl CertRequest {
    pub const SELF_SIGNED: &'static str = "self-signed";
    pub const TRAEFIK_ME: &'static str = "traefik.me";

    pub fn category(&self) -> &str {
        match self {
            CertRequest::SelfSigned(_) => Self::SELF_SIGNED,
            CertRequest::TraefikMe(_) => Self::TRAEFIK_ME,
            CertRequest::Unknown(kind) => kind,
        }
    }
}

impl<'de> Deserialize<'de> for CertRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| de::Error::missing_field("type"))?
            .to_string();

        match kind.as_str() {
            Self::SELF_SIGNED => SelfSignedRequest::deserialize(value)
                .map(CertRequest::SelfSigned)
                .map_err(de::Error::custom),
            Self::TRAEFIK_ME => TraefikMeRequest::deserialize(value)
                .map(CertRequest::TraefikMe)
                .map_err(de::Error::custom),
            _ => Ok(CertRequest::Unknown(kind)),
        }
    }
}

/// Self-signed entry: any number of server and client certificates, all
/// signed by the run's shared authority.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SelfSignedRequest {
    #[serde(default, alias = "caFile")]
    pub ca_file: Option<String>,
    #[serde(default)]
    pub server: Vec<SingleCertRequest>,
    #[serde(default)]
    pub client: Vec<SingleCertRequest>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SingleCertRequest {
    #[serde(default)]
    pub identities: Option<BTreeSet<String>>,
    #[serde(default, alias = "certFile")]
    pub cert_file: Option<String>,
    #[serde(default, alias = "keyFile")]
    pub key_file: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TraefikMeRequest {
    #[serde(default, alias = "certFile")]
    pub cert_file: Option<String>,
    #[serde(default, alias = "keyFile")]
    pub key_file: Option<String>,
}
