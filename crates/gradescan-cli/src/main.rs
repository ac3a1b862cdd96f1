//! gradescan CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gradescan", version, about = "Answer-sheet OCR and rubric scoring")]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one scanned answer sheet
    Analyze {
        /// Path to the scanned sheet image
        #[arg(long)]
        image: PathBuf,

        /// Rubric file (.json or .toml)
        #[arg(long)]
        rubrics: PathBuf,

        /// Student identifier to record on the result
        #[arg(long)]
        student: Option<String>,

        /// Sheet identifier (generated when omitted)
        #[arg(long)]
        sheet_id: Option<String>,

        /// Output directory (defaults to results_dir from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, markdown, csv, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Analyze every sheet image in a directory
    Batch {
        /// Directory of scanned sheet images
        #[arg(long)]
        directory: PathBuf,

        /// Rubric file (.json or .toml)
        #[arg(long)]
        rubrics: PathBuf,

        /// Output directory (defaults to results_dir from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, markdown, csv, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a rubric file
    Validate {
        /// Rubric file (.json or .toml)
        #[arg(long)]
        rubrics: PathBuf,
    },

    /// Create starter config and an example rubric
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let result = match cli.command {
        Commands::Analyze {
            image,
            rubrics,
            student,
            sheet_id,
            output,
            format,
            config,
        } => {
            commands::analyze::execute(image, rubrics, student, sheet_id, output, format, config)
                .await
        }
        Commands::Batch {
            directory,
            rubrics,
            output,
            format,
            config,
        } => commands::batch::execute(directory, rubrics, output, format, config).await,
        Commands::Validate { rubrics } => commands::validate::execute(rubrics),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
