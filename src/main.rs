use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pigen::commands::{
    check_file, init_project, ping, plan_generation, print_check_result, run_generation, RunOptions,
};
use pigen::models::TargetMode;
use pigen::PigenError;

/// pigen - Gemini-driven generator of validated embedded C examples for Raspberry Pi
#[derive(Parser)]
#[command(name = "pigen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a pigen project (pigen.toml and taxonomy.toml)
    Init {
        /// Project directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Target board; prompts when omitted
        #[arg(long, value_enum)]
        mode: Option<TargetMode>,
    },

    /// Generate examples
    Run {
        /// Number of examples to generate (raised to cover every subcategory)
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,

        /// Seed for the work queue and context sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Override the model to use
        #[arg(long)]
        model: Option<String>,

        /// Override the target board
        #[arg(long, value_enum)]
        mode: Option<TargetMode>,

        /// Override the attempt budget per example
        #[arg(long)]
        retries: Option<u32>,

        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the work items a run would process, without calling the API
    Plan {
        /// Number of examples to plan
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,

        /// Seed for the work queue
        #[arg(long)]
        seed: Option<u64>,

        /// Override the target board
        #[arg(long, value_enum)]
        mode: Option<TargetMode>,
    },

    /// Validate a local C file offline
    Check {
        /// C source file to check
        file: PathBuf,

        /// Require the code to implement this subcategory
        #[arg(short, long)]
        subcategory: Option<String>,

        /// Build command to classify as C or C++
        #[arg(short, long)]
        build_command: Option<String>,

        /// Override the target board
        #[arg(long, value_enum)]
        mode: Option<TargetMode>,
    },

    /// Test connectivity to the model API
    Ping {
        /// Override the model to use
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();

    let result = run_command(cli.command).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands) -> Result<(), PigenError> {
    let project_root = std::env::current_dir()?;

    match command {
        Commands::Init { path, mode } => {
            let project_root = path.unwrap_or(project_root);
            init_project(&project_root, mode)
        }

        Commands::Run {
            count,
            seed,
            model,
            mode,
            retries,
            output,
        } => {
            let options = RunOptions {
                count,
                seed,
                model,
                mode,
                retries,
                output,
            };
            run_generation(&project_root, options).await
        }

        Commands::Plan { count, seed, mode } => {
            let options = RunOptions {
                count,
                seed,
                mode,
                ..RunOptions::default()
            };
            plan_generation(&project_root, options).map(|_| ())
        }

        Commands::Check {
            file,
            subcategory,
            build_command,
            mode,
        } => {
            let result = check_file(
                &project_root,
                &file,
                subcategory.as_deref(),
                build_command.as_deref(),
                mode,
            )?;
            print_check_result(&file, &result);
            if !result.passed() {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Ping { model } => ping(&project_root, model).await,
    }
}
