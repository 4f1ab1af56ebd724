use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "certbox")]
#[command(about = "Certbox - provision TLS certificates for local development")]
#[command(version)]
pub struct Cli {
    #[arg(
        short = 'c',
        long,
        help = "Path to the JSON configuration file",
        value_name = "PATH",
        default_value = "certbox.json"
    )]
    pub config: PathBuf,

    #[arg(
        short = 'C',
        long,
        help = "CA certificate path, overrides the config file",
        value_name = "PATH"
    )]
    pub ca_cert: Option<PathBuf>,

    #[arg(
        short = 'K',
        long,
        help = "CA private key path, overrides the config file",
        value_name = "PATH"
    )]
    pub ca_key: Option<PathBuf>,

    #[arg(
        long,
        help = "Set the global log level",
        value_name = "LEVEL",
        default_value = "info"
    )]
    pub log_level: String,
}

impl Cli {
    pub fn level_filter(&self) -> log::LevelFilter {
        parse_level(&self.log_level)
    }
}

pub fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}
