//! Command launcher for waypost applications.
//!
//! Parses a command (serve or generate) plus a root directory, and for
//! serve, a bind address. The host application owns its [`UnitLoader`] and
//! its `main`; this crate wires parsing, alias generation, discovery and
//! the transport together:
//!
//! ```no_run
//! use clap::Parser;
//! use std::sync::Arc;
//! use waypost::UnitTable;
//! use waypost_cli::Cli;
//!
//! #[tokio::main]
//! async fn main() {
//!     waypost_cli::init_tracing();
//!     let loader = UnitTable::new(); // the host registers its units here
//!     if let Err(cause) = waypost_cli::run(Cli::parse(), Arc::new(loader)).await {
//!         tracing::error!(%cause, "launch failed");
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod server;

use clap::{Parser, Subcommand};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use waypost::{App, DiscoveryError, UnitLoader};

/// The waypost command line.
#[derive(Debug, Parser)]
#[command(name = "waypost", version, about = "filesystem-convention web microframework")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate service alias markers, then discover routes and serve them.
    Serve {
        /// Root directory to walk for routes.
        #[arg(long, default_value = "routes")]
        root: PathBuf,

        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },

    /// Generate service alias markers only.
    Generate {
        /// Root directory to walk for routes.
        #[arg(long, default_value = "routes")]
        root: PathBuf,

        /// Output file. Defaults to `<root>/service_aliases.rs`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("discovery error: {source}")]
    Discovery {
        #[from]
        source: DiscoveryError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Installs the default fmt subscriber at INFO level.
pub fn init_tracing() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Runs the parsed command against the host-supplied loader.
///
/// Serve regenerates aliases first, so the editor-facing names and the
/// served registry always come from the same tree.
pub async fn run(cli: Cli, loader: Arc<dyn UnitLoader>) -> Result<(), LaunchError> {
    match cli.command {
        Command::Generate { root, output } => {
            let out = output.unwrap_or_else(|| root.join("service_aliases.rs"));
            waypost::generate_to(&root, loader.as_ref(), &out)?;
            Ok(())
        }
        Command::Serve { root, addr } => {
            waypost::generate_to(&root, loader.as_ref(), &root.join("service_aliases.rs"))?;
            let app = Arc::new(App::new(root, loader));
            server::serve(app, addr).await
        }
    }
}
