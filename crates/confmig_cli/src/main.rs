//! confmig CLI
//!
//! Command-line tools for exporting and importing configuration bundles.
//!
//! # Commands
//!
//! - `export` - package entities from a store file into a bundle
//! - `import` - apply a bundle to a store file
//! - `inspect` - display a bundle's references and mappings

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// confmig command-line bundle migration tools.
#[derive(Parser)]
#[command(name = "confmig")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package entities from a store file into a bundle
    Export {
        /// Path to the source store file (JSON)
        #[arg(short, long)]
        store: PathBuf,

        /// Output bundle path (CBOR)
        #[arg(short, long)]
        out: PathBuf,

        /// Root entities as type:id pairs (default: export everything)
        #[arg(short, long)]
        root: Vec<String>,

        /// Export one folder subtree by folder id or absolute path
        #[arg(short, long, conflicts_with = "root")]
        folder: Option<String>,

        /// Export the roots only; the target must supply the dependencies
        #[arg(long)]
        no_dependencies: bool,

        /// Strip secret material from the bundle
        #[arg(long, conflicts_with = "passphrase")]
        omit_secrets: bool,

        /// Encrypt secret material with this passphrase
        #[arg(short, long)]
        passphrase: Option<String>,
    },

    /// Apply a bundle to a store file
    Import {
        /// Path to the target store file (JSON)
        #[arg(short, long)]
        store: PathBuf,

        /// Bundle path (CBOR)
        #[arg(short, long)]
        bundle: PathBuf,

        /// Run the resolution without committing anything
        #[arg(short, long)]
        dry_run: bool,

        /// Passphrase for encrypted bundle secrets
        #[arg(short, long)]
        passphrase: Option<String>,

        /// Override every mapping's action
        /// (new-or-existing, new-or-update, always-create-new, delete, ignore)
        #[arg(short = 'a', long)]
        default_action: Option<String>,
    },

    /// Display a bundle's references and mappings
    Inspect {
        /// Bundle path (CBOR)
        #[arg(short, long)]
        bundle: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Export {
            store,
            out,
            root,
            folder,
            no_dependencies,
            omit_secrets,
            passphrase,
        } => {
            commands::export::run(
                &store,
                &out,
                &root,
                folder.as_deref(),
                no_dependencies,
                omit_secrets,
                passphrase.as_deref(),
            )?;
        }
        Commands::Import {
            store,
            bundle,
            dry_run,
            passphrase,
            default_action,
        } => {
            commands::import::run(
                &store,
                &bundle,
                dry_run,
                passphrase.as_deref(),
                default_action.as_deref(),
            )?;
        }
        Commands::Inspect { bundle, format } => {
            commands::inspect::run(&bundle, &format)?;
        }
        Commands::Version => {
            println!("confmig CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
