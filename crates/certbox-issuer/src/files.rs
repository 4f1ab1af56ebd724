use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::Error;

/// Certificate files are world-readable, key files are owner-only.
pub const CERT_FILE_MODE: u32 = 0o644;
pub const KEY_FILE_MODE: u32 = 0o600;

/// Writes a PEM chain: the first entry starts the file, every following
/// entry is appended to it.
pub async fn write_certificate(path: &Path, chain_pem: &[String]) -> Result<(), Error> {
    let mut file = fs::File::create(path).await?;
    for entry in chain_pem {
        file.write_all(entry.as_bytes()).await?;
    }
    file.flush().await?;
    drop(file);

    set_mode(path, CERT_FILE_MODE).await
}

pub async fn write_private_key(path: &Path, key_pem: &str) -> Result<(), Error> {
    fs::write(path, key_pem).await?;
    set_mode(path, KEY_FILE_MODE).await
}

pub async fn write_text(path: &Path, body: &str, mode: u32) -> Result<(), Error> {
    fs::write(path, body).await?;
    set_mode(path, mode).await
}

#[cfg(unix)]
pub async fn set_mode(path: &Path, mode: u32) -> Result<(), Error> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
pub async fn set_mode(_path: &Path, _mode: u32) -> Result<(), Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_certificate_appends_chain_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cert.pem");
        let chain = vec![
            "-----BEGIN CERTIFICATE-----\nleaf\n-----END CERTIFICATE-----\n".to_string(),
            "-----BEGIN CERTIFICATE-----\nintermediate\n-----END CERTIFICATE-----\n".to_string(),
        ];

        write_certificate(&path, &chain).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, chain.concat());
        assert_eq!(written.matches("BEGIN CERTIFICATE").count(), 2);
    }

    #[tokio::test]
    async fn test_write_certificate_truncates_previous_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cert.pem");
        std::fs::write(&path, "stale").unwrap();

        write_certificate(&path, &["fresh".to_string()]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_policy() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let cert_path = temp_dir.path().join("cert.pem");
        let key_path = temp_dir.path().join("key.pem");

        write_certificate(&cert_path, &["cert".to_string()]).await.unwrap();
        write_private_key(&key_path, "key").await.unwrap();

        let cert_mode = std::fs::metadata(&cert_path).unwrap().permissions().mode();
        let key_mode = std::fs::metadata(&key_path).unwrap().permissions().mode();
        assert_eq!(cert_mode & 0o777, 0o644);
        assert_eq!(key_mode & 0o777, 0o600);
    }
}
