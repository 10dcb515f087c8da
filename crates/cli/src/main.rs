//! `catalog`: run and inspect the library catalog service.

use std::path::{Path, PathBuf};

use anyhow::Context;
use catalog_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "catalog", about = "Library catalog service", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// JSON fixture to seed the store with, overriding `store.seed_path`
        #[arg(long, value_name = "FILE")]
        seed: Option<PathBuf>,

        /// Port to listen on, overriding `server.port`
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the resolved configuration and exit
    CheckConfig,

    /// Load a fixture, apply migrations and check that every book and copy
    /// reference resolves
    CheckSeed {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

fn load_settings(config_dir: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match config_dir {
        Some(dir) => Settings::load_from(dir),
        None => Settings::load(),
    };
    settings.with_context(|| "failed to load catalog settings")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config_dir.as_deref())?;

    match cli.command {
        Command::Serve { seed, port } => {
            if let Some(seed) = seed {
                settings.store.seed_path = Some(seed.display().to_string());
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            catalog_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "catalog serve starting");
            catalog_app::run(&settings).await
        }
        Command::CheckConfig => {
            println!("environment: {:?}", settings.environment);
            println!("server: {}:{}", settings.server.host, settings.server.port);
            println!("request_timeout_ms: {}", settings.server.request_timeout_ms);
            println!(
                "seed_path: {}",
                settings.store.seed_path.as_deref().unwrap_or("(none)")
            );
            println!(
                "telemetry: {:?} at {}",
                settings.telemetry.log_format, settings.telemetry.log_level
            );
            Ok(())
        }
        Command::CheckSeed { path } => {
            settings.store.seed_path = Some(path.display().to_string());
            let broken = catalog_app::bootstrap::check_fixture(&settings)
                .await
                .with_context(|| format!("fixture {} violates a unique key", path.display()))?;
            if !broken.is_empty() {
                for reference in &broken {
                    eprintln!("{reference}");
                }
                anyhow::bail!(
                    "fixture {} has {} broken reference(s)",
                    path.display(),
                    broken.len()
                );
            }
            println!("fixture {} is consistent", path.display());
            Ok(())
        }
    }
}
