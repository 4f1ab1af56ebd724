pub mod args;
pub mod handler;

pub use args::Cli;
pub use handler::CliHandler;
