mod cli;

use clap::Parser;

use crate::cli::{
    Cli,
    CliHandler,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .init();

    let handler = CliHandler::new(cli);
    handler.run().await
}
