//! CLI entry point for cxxcapi.

use clap::Parser;
use cxxcapi::Config;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cxxcapi=info")),
        )
        .init();

    let config = Config::parse();

    match cxxcapi::run(&config) {
        Ok((_session, output)) => {
            tracing::info!(files = output.files.len(), "done");
        }
        Err(err) => {
            if let Some(fatal) = err.downcast_ref::<cxxcapi::FatalError>() {
                eprintln!("error: {fatal}");
                std::process::exit(fatal.exit_code());
            }
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
