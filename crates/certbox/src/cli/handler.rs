use certbox_commons::utils::config::load_config;
use certbox_issuer::certify;
use log::{
    error,
    info,
};

use crate::cli::args::Cli;

pub struct CliHandler {
    cli: Cli,
}

impl CliHandler {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Loading config...");

        let mut config = match load_config(&self.cli.config).await {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to parse config: {e}");
                std::process::exit(1);
            }
        };

        if let Some(ca_cert) = &self.cli.ca_cert {
            config.ca_cert = Some(ca_cert.clone());
        }
        if let Some(ca_key) = &self.cli.ca_key {
            config.ca_key = Some(ca_key.clone());
        }

        info!("Config loaded!");
        info!("Generating certificates...");

        certify(&config).await?;

        info!("Certificates generated!");
        Ok(())
    }
}
