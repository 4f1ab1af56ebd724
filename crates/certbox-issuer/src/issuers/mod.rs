pub mod selfsigned;
pub mod traefik;

use std::collections::BTreeSet;
use std::hash::{
    Hash,
    Hasher,
};
use std::path::PathBuf;

use async_trait::async_trait;
use certbox_commons::models::config_model::CertRequest;
use once_cell::sync::Lazy;

use crate::authority::Authority;
use crate::error::Error;

pub use selfsigned::SelfSignedIssuer;
pub use traefik::TraefikMeIssuer;

/// Everything an issuer needs for one service: the shared authority, the
/// service's output directory, and the configured defaults.
pub struct IssueContext<'a> {
    pub authority: &'a Authority,
    pub organization: &'a str,
    pub unit: &'a str,
    pub name: &'a str,
    pub path: PathBuf,
    pub default_identities: &'a BTreeSet<String>,
    pub default_ca_file: &'a str,
    pub default_cert_file: &'a str,
    pub default_key_file: &'a str,
    pub default_client_cert_file: &'a str,
    pub default_client_key_file: &'a str,
    pub http: &'a reqwest::Client,
}

/// An issuance strategy, registered under a category string that matches the
/// `type` discriminator of the certificate requests it handles.
#[async_trait]
pub trait Issuer: Send + Sync {
    fn category(&self) -> &'static str;

    async fn issue(&self, context: &IssueContext<'_>, request: &CertRequest)
        -> Result<(), Error>;
}

impl PartialEq for dyn Issuer {
    fn eq(&self, other: &Self) -> bool {
        self.category() == other.category()
    }
}

impl Eq for dyn Issuer {}

impl Hash for dyn Issuer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.category().hash(state);
    }
}

// The compiled-in set of issuance strategies.
static ISSUERS: Lazy<Vec<Box<dyn Issuer>>> = Lazy::new(|| {
    vec![
        Box::new(SelfSignedIssuer),
        Box::new(TraefikMeIssuer::new()),
    ]
});

/// Looks up the issuer registered under `category`.
pub fn issuer_for(category: &str) -> Result<&'static dyn Issuer, Error> {
    ISSUERS
        .iter()
        .map(|issuer| issuer.as_ref())
        .find(|issuer| issuer.category() == category)
        .ok_or_else(|| Error::UnknownCategory(category.to_string()))
}

pub fn categories() -> Vec<&'static str> {
    ISSUERS.iter().map(|issuer| issuer.category()).collect()
}
