use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use qualify::{Result, ValidationConfig};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "qualify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "IQ/OQ/PQ qualification and validation state for a calculation engine",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to qualify.toml (defaults to ./qualify.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the engine is currently validated
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the IQ → OQ → PQ qualification workflow
    Run {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Do not generate a certificate
        #[arg(long)]
        no_certificate: bool,
    },

    /// Show recent validation events, newest first
    History {
        /// Maximum number of events
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop the oldest history events beyond a maximum
    #[command(name = "trim-history")]
    TrimHistory {
        /// Number of most recent events to keep
        #[arg(long)]
        max: usize,
    },

    /// Print the content hash of the engine source tree
    Hash {
        /// Directory to hash (defaults to the configured engine_dir)
        path: Option<PathBuf>,
    },

    /// Print the current environment fingerprint
    Fingerprint {
        /// Print the fingerprint as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default qualify.toml in the current directory
    Init {
        /// Overwrite an existing qualify.toml
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    match path {
        Some(path) => {
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| cwd.clone());
            let root = if root.is_relative() { cwd.join(root) } else { root };
            Ok(ValidationConfig::load_from(path)?.resolve_paths(&root))
        }
        None => Ok(ValidationConfig::load(&cwd)?.resolve_paths(&cwd)),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", format!("Error: failed to create tokio runtime: {}", e).red());
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_async(cli)) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

async fn run_async(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "qualify", &mut io::stdout());
            Ok(())
        }
        Commands::Init { force } => init(force),
        command => {
            let config = load_config(cli.config.as_deref())?;
            match command {
                Commands::Status { json } => qualify::cli::status::run(&config, json),
                Commands::Run { yes, no_certificate } => {
                    qualify::cli::run::run(&config, yes, no_certificate).await
                }
                Commands::History { limit, json } => {
                    qualify::cli::history::run(&config, limit, json)
                }
                Commands::TrimHistory { max } => qualify::cli::history::trim(&config, max),
                Commands::Hash { path } => qualify::cli::inspect::hash(&config, path.as_deref()),
                Commands::Fingerprint { json } => qualify::cli::inspect::fingerprint(&config, json),
                Commands::Completions { .. } | Commands::Init { .. } => Ok(()),
            }
        }
    }
}

fn init(force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let path = cwd.join(qualify::config::CONFIG_FILE);
    if path.exists() && !force {
        let message = format!("{} already exists (use --force to overwrite)", path.display());
        println!("{}", message.yellow());
        return Ok(());
    }
    ValidationConfig::default().save(&cwd)?;
    println!("{}", format!("✅ Wrote {}", path.display()).green());
    Ok(())
}
