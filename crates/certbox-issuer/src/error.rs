use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Certificate generation error: {0}")]
    CertGen(#[from] rcgen::Error),

    #[error("Authority error: {0}")]
    Authority(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown certificate type: {0}")]
    UnknownCategory(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(anyhow::anyhow!(e))
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(anyhow::anyhow!(e.to_string()))
    }
}
