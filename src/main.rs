use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use showreel::library::Library;
use showreel::{CatalogBackend, Config, ObjectsBackend};

#[derive(Parser)]
struct Cli {
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .compact()
        .init();

    tracing::info!("info enabled");
    tracing::warn!("warning enabled");
    tracing::debug!("debug enabled");
    tracing::trace!("trace enabled");

    // load configuration
    let mut dev_config = File::open(cli.config_file.unwrap_or("./dev-config.yml".into()))?;
    let mut s = String::new();
    dev_config.read_to_string(&mut s)?;
    let config: Config = serde_yaml::from_str(&s)?;

    // initialize persistence and storage backends
    let catalog = match config.catalog {
        CatalogBackend::Postgres(cfg) => cfg.new_catalog().await?,
    };
    let objects = match config.objects {
        ObjectsBackend::S3(cfg) => cfg.new_objects().await?,
    };
    let gate = config.cdn.new_gate()?;

    let library = Library::new(catalog, objects);

    // run HTTP server
    showreel::http::serve(library, gate).await?;

    Ok(())
}
