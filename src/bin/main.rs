use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use linkgate::{AppConfig, generate_token, hash_secret};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linkgate")]
#[command(about = "Magic-link and OAuth2 client authentication service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Bind address override, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,
        /// Path to the JSON configuration file
        #[arg(long, env = "LINKGATE_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Hash a client secret for provisioning in the configuration file
    HashSecret {
        /// The raw secret to digest
        secret: String,
    },
    /// Generate a fresh opaque token and its digest
    GenerateToken,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("linkgate=info".parse()?))
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let mut app_config = match config {
                Some(path) => AppConfig::from_file(&path)?,
                None => AppConfig::load()?,
            };
            if let Some(bind) = bind {
                app_config.bind = bind;
            }

            info!(
                users = app_config.users.len(),
                clients = app_config.clients.len(),
                "seeding in-memory principal store"
            );

            let bind = app_config.bind.clone();
            let (state, _store) = linkgate::create_app(app_config);
            linkgate::server::start_http(state, &bind).await
        }
        Commands::HashSecret { secret } => {
            println!("{}", hash_secret(&secret));
            Ok(())
        }
        Commands::GenerateToken => {
            let (token, digest) = generate_token();
            println!("token:  {}", token);
            println!("digest: {}", digest);
            Ok(())
        }
    }
}
