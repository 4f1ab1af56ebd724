use std::path::Path;
use std::time::Duration;

use certbox_commons::models::config_model::{
    CertRequest,
    Config,
};
use log::{
    error,
    info,
    warn,
};
use tokio::fs;

use crate::authority::Authority;
use crate::error::Error;
use crate::issuers::{
    self,
    IssueContext,
};

/// Issues certificates for every configured service.
///
/// The authority is obtained once and shared across the run. Per-service
/// failures are logged and do not stop the remaining services; only an
/// authority that cannot be loaded aborts the whole run.
pub async fn certify(config: &Config) -> Result<(), Error> {
    let authority = obtain_authority(config).await?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()?;

    for (name, request) in &config.certs {
        if let Err(e) = certify_service(&authority, &http, config, name, request).await {
            error!("Failed to issue certificates for {name}: {e}");
        }
    }

    Ok(())
}

async fn obtain_authority(config: &Config) -> Result<Authority, Error> {
    if let (Some(ca_cert), Some(ca_key)) = (&config.ca_cert, &config.ca_key) {
        if ca_cert.exists() && ca_key.exists() {
            info!("Using existing CA certificate from {}", ca_cert.display());
            let cert_pem = fs::read_to_string(ca_cert).await?;
            let key_pem = fs::read_to_string(ca_key).await?;
            return Authority::load_from_pem(
                &cert_pem,
                &key_pem,
                &config.organization,
                &config.unit,
            );
        }
        warn!("CA cert or key not found, generating new CA.");
    }

    Authority::create(&config.organization, &config.unit)
}

async fn certify_service(
    authority: &Authority, http: &reqwest::Client, config: &Config, name: &str,
    request: &CertRequest,
) -> Result<(), Error> {
    let subpath = config.path.join(name);

    if directory_populated(&subpath).await? {
        warn!("Certificates for {name} already exist, skipping...");
        return Ok(());
    }

    fs::create_dir_all(&subpath).await?;

    let issuer = match issuers::issuer_for(request.category()) {
        Ok(issuer) => issuer,
        Err(Error::UnknownCategory(category)) => {
            error!(
                "Unknown certificate type {category} for {name}! Expected one of: {}. Skipping...",
                issuers::categories().join(", ")
            );
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let context = IssueContext {
        authority,
        organization: &config.organization,
        unit: &config.unit,
        name,
        path: subpath,
        default_identities: &config.default_identities,
        default_ca_file: &config.default_ca_file,
        default_cert_file: &config.default_cert_file,
        default_key_file: &config.default_key_file,
        default_client_cert_file: &config.default_client_cert_file,
        default_client_key_file: &config.default_client_key_file,
        http,
    };

    info!("Generating {} certificates for {name}...", issuer.category());
    issuer.issue(&context, request).await?;
    info!("Certificates for {name} generated!");

    Ok(())
}

/// A service directory that already contains anything is treated as issued.
async fn directory_populated(path: &Path) -> Result<bool, Error> {
    if !path.exists() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_some())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use certbox_commons::models::config_model::{
        SelfSignedRequest,
        SingleCertRequest,
    };

    use super::*;

    fn self_signed_entry() -> CertRequest {
        CertRequest::SelfSigned(SelfSignedRequest {
            server: vec![SingleCertRequest::default()],
            ..Default::default()
        })
    }

    fn config_for(root: &Path, certs: BTreeMap<String, CertRequest>) -> Config {
        Config {
            path: root.to_path_buf(),
            certs,
            ..Default::default()
        }
    }

    fn service_files(root: &Path, name: &str) -> Vec<String> {
        let mut files: Vec<String> = std::fs::read_dir(root.join(name))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_certify_self_signed_service() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("out");
        let config = config_for(
            &root,
            BTreeMap::from([("web".to_string(), self_signed_entry())]),
        );

        certify(&config).await.unwrap();

        assert_eq!(
            service_files(&root, "web"),
            vec!["ca.pem", "cert.pem", "key.pem"]
        );
    }

    #[tokio::test]
    async fn test_certify_is_idempotent_by_directory_presence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("out");
        let config = config_for(
            &root,
            BTreeMap::from([("web".to_string(), self_signed_entry())]),
        );

        certify(&config).await.unwrap();
        let key_before = std::fs::read(root.join("web/key.pem")).unwrap();

        certify(&config).await.unwrap();
        let key_after = std::fs::read(root.join("web/key.pem")).unwrap();

        assert_eq!(key_before, key_after);
        assert_eq!(
            service_files(&root, "web"),
            vec!["ca.pem", "cert.pem", "key.pem"]
        );
    }

    #[tokio::test]
    async fn test_certify_skips_populated_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("out");
        std::fs::create_dir_all(root.join("web")).unwrap();
        std::fs::write(root.join("web/sentinel"), "x").unwrap();
        let config = config_for(
            &root,
            BTreeMap::from([("web".to_string(), self_signed_entry())]),
        );

        certify(&config).await.unwrap();

        assert_eq!(service_files(&root, "web"), vec!["sentinel"]);
    }

    #[tokio::test]
    async fn test_certify_isolates_unknown_certificate_type() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("out");
        let config = config_for(
            &root,
            BTreeMap::from([
                ("bad".to_string(), CertRequest::Unknown("acme".to_string())),
                ("web".to_string(), self_signed_entry()),
            ]),
        );

        certify(&config).await.unwrap();

        // the failed entry leaves its (empty) directory behind; the healthy
        // one still completes
        assert!(service_files(&root, "bad").is_empty());
        assert_eq!(
            service_files(&root, "web"),
            vec!["ca.pem", "cert.pem", "key.pem"]
        );
    }

    #[tokio::test]
    async fn test_certify_reuses_persisted_authority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("out");

        let key_pair = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::default();
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "certbox Local CA");
        let ca_cert = params.self_signed(&key_pair).unwrap();

        let ca_cert_path = temp_dir.path().join("ca.pem");
        let ca_key_path = temp_dir.path().join("ca.key");
        std::fs::write(&ca_cert_path, ca_cert.pem()).unwrap();
        std::fs::write(&ca_key_path, key_pair.serialize_pem()).unwrap();

        let config = Config {
            path: root.clone(),
            ca_cert: Some(ca_cert_path),
            ca_key: Some(ca_key_path),
            certs: BTreeMap::from([("web".to_string(), self_signed_entry())]),
            ..Default::default()
        };

        certify(&config).await.unwrap();

        // every service directory carries the persisted CA cert verbatim
        let written = std::fs::read_to_string(root.join("web/ca.pem")).unwrap();
        assert_eq!(written, ca_cert.pem());
    }

    #[tokio::test]
    async fn test_certify_fails_on_unparsable_authority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ca_cert_path = temp_dir.path().join("ca.pem");
        let ca_key_path = temp_dir.path().join("ca.key");
        std::fs::write(&ca_cert_path, "garbage").unwrap();
        std::fs::write(&ca_key_path, "garbage").unwrap();

        let config = Config {
            path: temp_dir.path().join("out"),
            ca_cert: Some(ca_cert_path),
            ca_key: Some(ca_key_path),
            certs: BTreeMap::from([("web".to_string(), self_signed_entry())]),
            ..Default::default()
        };

        let result = certify(&config).await;

        assert!(matches!(result, Err(Error::Authority(_))));
    }

    #[tokio::test]
    async fn test_certify_generates_authority_when_paths_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("out");
        let config = Config {
            path: root.clone(),
            ca_cert: Some(temp_dir.path().join("absent.pem")),
            ca_key: Some(temp_dir.path().join("absent.key")),
            certs: BTreeMap::from([("web".to_string(), self_signed_entry())]),
            ..Default::default()
        };

        certify(&config).await.unwrap();

        assert_eq!(
            service_files(&root, "web"),
            vec!["ca.pem", "cert.pem", "key.pem"]
        );
    }
}
