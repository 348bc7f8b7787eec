mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tc_catalog::CatalogStore;
use tc_core::config::Config;
use tc_server::auth;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting trailcam server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    tc_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults by verbosity.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "trailcam=trace,tc_server=trace,tc_catalog=trace,tc_core=debug,tower_http=debug"
                .to_string()
        } else {
            "trailcam=info,tc_server=debug,tc_catalog=info,tower_http=info".to_string()
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
        Commands::CheckCatalog { path } => check_catalog(path.as_deref(), cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::HashPassword { password } => hash_password(&password),
        Commands::GenerateSecret => generate_secret(),
        Commands::Version => {
            println!("trailcam {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_catalog(path: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    if let Some(path) = path {
        config.catalog.path = path.to_path_buf();
    }

    let store = CatalogStore::load(&config.catalog)
        .with_context(|| format!("failed to load {}", config.catalog.path.display()))?;
    let catalog = store.snapshot();

    println!("Taxonomy: {}", config.catalog.path.display());
    println!("  Videos: {}", catalog.len());
    if let Some((first, last)) = catalog.time_span() {
        println!("  Span: {first} .. {last}");
    }
    println!(
        "  Restricted: {}",
        catalog.entries().iter().filter(|e| e.label.restricted).count()
    );
    println!("  Sites: {}", catalog.sites().len());
    for (name, gps) in catalog.sites() {
        println!("    {name} ({:.5}, {:.5})", gps.lat(), gps.lon());
    }

    let vocabulary = catalog.vocabulary();
    println!("  Animals: {}", vocabulary.animals.join(", "));
    println!("  Actions: {}", vocabulary.actions.join(", "));
    println!("  Additional labels: {}", vocabulary.add_labels.join(", "));

    let missing = catalog
        .entries()
        .iter()
        .filter(|e| !Path::new(&e.key).is_file())
        .count();
    if missing > 0 {
        println!("  Warning: {missing} indexed videos are not present on disk");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with warnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Taxonomy: {}", config.catalog.path.display());
    println!("  Auth enabled: {}", config.auth.enabled);
    println!("  Token TTL: {} minutes", config.auth.token_ttl_minutes);

    Ok(())
}

fn hash_password(password: &str) -> Result<()> {
    let hash = auth::hash_password(password)?;
    println!("{}", hash);
    Ok(())
}

fn generate_secret() -> Result<()> {
    let secret = auth::generate_secret();
    println!("{}", secret);
    Ok(())
}
