//! CRM GraphQL server.
//!
//! # Usage
//!
//! ```bash
//! # Serve an empty store on CRM_HOST:CRM_PORT
//! crm serve
//!
//! # Serve with random sample customers, products and orders
//! crm serve --seed
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crm_graphql::seed::{seed, SeedCounts};
use crm_graphql::server::{serve, AppState};
use crm_graphql::{Config, CrmService, MemoryStore};

#[derive(Parser)]
#[command(name = "crm")]
#[command(author, version, about = "GraphQL API for customers, products and orders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the GraphQL server
    Serve {
        /// Fill the store with random sample data before serving
        #[arg(long)]
        seed: bool,
    },
}

fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crm_graphql=info,crm=info,tower_http=info".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    match cli.command {
        Commands::Serve { seed: with_seed } => {
            let service = CrmService::new(Arc::new(MemoryStore::new()));
            if with_seed {
                let mut rng = StdRng::seed_from_u64(rand::random());
                if let Err(e) = seed(&service, SeedCounts::default(), &mut rng).await {
                    tracing::error!(error = %e, "seeding failed");
                    return ExitCode::FAILURE;
                }
            }

            let state = AppState::new(service, &config);
            if let Err(e) = serve(&config, state).await {
                tracing::error!(error = %e, "server error");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
