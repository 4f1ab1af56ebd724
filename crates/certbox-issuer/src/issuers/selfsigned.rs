use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use certbox_commons::models::config_model::{
    CertRequest,
    SingleCertRequest,
};
use log::info;
use tokio::fs;

use crate::error::Error;
use crate::files;
use crate::issuers::{
    IssueContext,
    Issuer,
};

pub const CATEGORY: &str = "self-signed";

/// Issues server and client certificates signed by the run's shared
/// authority, then writes the authority's own certificate next to them.
pub struct SelfSignedIssuer;

#[async_trait]
impl Issuer for SelfSignedIssuer {
    fn category(&self) -> &'static str {
        CATEGORY
    }

    async fn issue(
        &self, context: &IssueContext<'_>, request: &CertRequest,
    ) -> Result<(), Error> {
        let CertRequest::SelfSigned(request) = request else {
            return Err(Error::Config(format!("expected a {CATEGORY} request")));
        };

        for single in &request.server {
            Self::issue_single(
                context,
                single,
                "server",
                context.default_cert_file,
                context.default_key_file,
            )
            .await?;
        }
        for single in &request.client {
            Self::issue_single(
                context,
                single,
                "client",
                context.default_client_cert_file,
                context.default_client_key_file,
            )
            .await?;
        }

        info!("Issuing CA certificate");
        let ca_file = request.ca_file.as_deref().unwrap_or(context.default_ca_file);
        let ca_path = context.path.join(ca_file);
        files::write_text(
            &ca_path,
            context.authority.certificate_pem(),
            files::CERT_FILE_MODE,
        )
        .await?;
        info!("CA certificate written to {}", ca_path.display());

        Ok(())
    }
}

impl SelfSignedIssuer {
    async fn issue_single(
        context: &IssueContext<'_>, single: &SingleCertRequest, kind: &str,
        default_cert_file: &str, default_key_file: &str,
    ) -> Result<(), Error> {
        let identities =
            effective_identities(single, context.name, context.default_identities);

        let cert_file = single.cert_file.as_deref().unwrap_or(default_cert_file);
        let key_file = single.key_file.as_deref().unwrap_or(default_key_file);

        let cert_file = safe_filename(&context.path, cert_file).await?;
        let key_file = safe_filename(&context.path, key_file).await?;

        info!(
            "Issuing {kind} certificate for {}...",
            identities.iter().cloned().collect::<Vec<_>>().join(", ")
        );

        let issued = context.authority.issue_certificate(
            &identities,
            Some(context.organization),
            Some(context.unit),
        )?;

        let cert_path = context.path.join(&cert_file);
        let key_path = context.path.join(&key_file);

        files::write_certificate(&cert_path, &issued.chain_pem).await?;
        files::write_private_key(&key_path, &issued.private_key_pem).await?;

        info!(
            "{kind} certificate written to {} and key to {}",
            cert_path.display(),
            key_path.display()
        );

        Ok(())
    }
}

/// Sub-request identities default to the service name, and the configured
/// default identities are always added on top.
fn effective_identities(
    single: &SingleCertRequest, name: &str, defaults: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut identities = match &single.identities {
        Some(identities) if !identities.is_empty() => identities.clone(),
        _ => BTreeSet::from([name.to_string()]),
    };
    identities.extend(defaults.iter().cloned());
    identities
}

/// Picks a filename that will not clobber anything already in `directory`.
///
/// If any existing file ends with `filename`, the new name gets a numeric
/// prefix one above the highest parseable prefix among those files (`-1`
/// when none parses, so the first collision yields `0.<filename>`). Based on
/// a directory listing, not a persisted counter, so concurrent writers to
/// the same directory race.
pub async fn safe_filename(directory: &Path, filename: &str) -> Result<String, Error> {
    let mut entries = fs::read_dir(directory).await?;
    let mut matching = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(filename) {
                matching.push(name);
            }
        }
    }

    if matching.is_empty() {
        return Ok(filename.to_string());
    }

    let highest = matching
        .iter()
        .filter_map(|name| name.split('.').next())
        .filter_map(|prefix| prefix.parse::<i64>().ok())
        .max()
        .unwrap_or(-1);

    Ok(format!("{}.{}", highest + 1, filename))
}
