mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use vrs_core::config::Config;
use vrs_core::storage::StorageLayout;
use vrs_server::pipeline::CommandPipeline;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;

    // CLI flags win over file and environment.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vrstream server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let pipeline = Arc::new(CommandPipeline::from_config(&config.pipeline));
    vrs_server::start(config, pipeline).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vrstream=trace,vrs_server=trace,vrs_core=debug,tower_http=debug".to_string()
        } else {
            "vrstream=info,vrs_server=info,vrs_core=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Paths => show_paths(cli.config.as_deref()),
        Commands::Version => {
            println!("vrstream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    println!("Configuration OK");
    println!("  listen: {}:{}", config.server.host, config.server.port);
    println!(
        "  max concurrent jobs: {}",
        config.pipeline.max_concurrent_jobs
    );
    print_layout(&StorageLayout::from_config(&config.storage));

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("\nNo warnings.");
    } else {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}

fn show_paths(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    print_layout(&StorageLayout::from_config(&config.storage));
    Ok(())
}

fn print_layout(layout: &StorageLayout) {
    let resolved = layout.resolve_streaming_dir();
    println!("  ingest root:  {}", layout.ingest_root.display());
    println!("  output root:  {}", layout.output_root.display());
    println!("  storage root: {}", layout.storage_root.display());
    println!("  final HLS:    {}", layout.final_hls_dir.display());
    println!("  streaming candidates:");
    for candidate in &layout.stream_candidates {
        let marker = if *candidate == resolved { "*" } else { " " };
        let state = if candidate.is_dir() { "exists" } else { "missing" };
        println!("   {marker} {} ({state})", candidate.display());
    }
}
