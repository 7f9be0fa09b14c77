use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use opbind_sdk::catalog::CatalogFormat;
use tracing::info;

use crate::store::Store;

mod api_access;
mod app;
mod attributes;
mod converters;
mod store;

#[derive(Parser, Debug)]
#[command(name = "attributes-demo", version, about = "Attribute and API access admin API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the admin API over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, env = "OPBIND_ADDR", default_value = "0.0.0.0:3000")]
        addr: SocketAddr,

        /// Maximum request body size in bytes
        #[arg(long, env = "OPBIND_BODY_LIMIT", default_value_t = 256 * 1024)]
        body_limit: usize,

        /// Request timeout in seconds
        #[arg(long, env = "OPBIND_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,

        /// Start with an empty store instead of the sample data
        #[arg(long)]
        empty: bool,
    },

    /// List commands and queries and whether the API exposes them
    ListOperations {
        /// Only list operations matching this pattern (repeatable)
        #[arg(short, long = "domain")]
        domains: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Regular)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Regular,
    Simple,
}

impl From<Format> for CatalogFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Regular => CatalogFormat::Regular,
            Format::Simple => CatalogFormat::Simple,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attributes_demo=info,opbind_sdk=info,opbind_server=info".into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve {
            addr,
            body_limit,
            timeout_secs,
            empty,
        } => {
            let store = Arc::new(if empty { Store::new() } else { Store::seeded() });
            let api = app::api(store)
                .with_body_limit(body_limit)
                .with_timeout(Duration::from_secs(timeout_secs));

            info!(%addr, "listening");
            let server = app::with_health(api).serve(addr);

            tokio::select! {
                res = server => {
                    res.with_context(|| format!("failed to serve on {addr}"))?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                }
            }
        }
        Commands::ListOperations { domains, format } => {
            let mut catalog = app::api(Arc::new(Store::new())).catalog().clone();
            catalog
                .filter_domains(domains.as_slice())
                .context("invalid domain pattern")?;
            print!("{}", catalog.render(format.into()));
        }
    }

    Ok(())
}
