//! Point d'entrée CLI pour cal-export

use anyhow::Result;
use cal_export::DatasetKind;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::Commands;

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Exporter les parcelles et bâtiments de Californie vers Parquet
#[derive(Parser)]
#[command(name = "cal-export")]
#[command(author, version)]
#[command(about = "Export California parcels and building footprints to Parquet with provenance")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Parcels(args) => {
            info!("Exporting parcels");
            cli::cmd_export(DatasetKind::Parcels, args)?;
        }
        Commands::Buildings(args) => {
            info!("Exporting buildings");
            cli::cmd_export(DatasetKind::Buildings, args)?;
        }
        Commands::Verify {
            files,
            report,
            area_model,
            config,
        } => {
            info!(files = files.len(), "Verifying files");
            cli::cmd_verify(&files, report.as_ref(), area_model, config.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
