//! strand - a consistency-aware file layer over object storage
//!
//! POSIX-like commands (`ls`, `cp`, `rm`, `cat`, `glob`, `sync`) over
//! S3-compatible endpoints and local paths.

mod commands;
mod exit_code;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputConfig;

#[derive(Parser, Debug)]
#[command(
    name = "strand",
    version,
    about = "A consistency-aware file layer over S3-compatible object storage",
    propagate_version = true
)]
struct Cli {
    /// Emit strict JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Endpoint profile to use for remote locations
    #[arg(long, global = true, env = "STRAND_PROFILE", default_value = "default")]
    profile: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a directory or object prefix
    Ls(commands::ls::LsArgs),

    /// Copy a file or object
    Cp(commands::cp::CpArgs),

    /// Remove a file or object
    Rm(commands::rm::RmArgs),

    /// Print file or object contents
    Cat(commands::cat::CatArgs),

    /// Expand a glob pattern
    Glob(commands::glob::GlobArgs),

    /// Synchronize two directory trees
    Sync(commands::sync::SyncArgs),

    /// Manage endpoint profiles
    Profile {
        #[command(subcommand)]
        command: commands::profile::ProfileCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_config = OutputConfig {
        json: cli.json,
        quiet: cli.quiet,
        no_color: cli.no_color,
    };

    let code = match cli.command {
        Commands::Ls(args) => commands::ls::execute(args, output_config, &cli.profile).await,
        Commands::Cp(args) => commands::cp::execute(args, output_config, &cli.profile).await,
        Commands::Rm(args) => commands::rm::execute(args, output_config, &cli.profile).await,
        Commands::Cat(args) => commands::cat::execute(args, output_config, &cli.profile).await,
        Commands::Glob(args) => commands::glob::execute(args, output_config, &cli.profile).await,
        Commands::Sync(args) => commands::sync::execute(args, output_config, &cli.profile).await,
        Commands::Profile { command } => commands::profile::execute(command, output_config).await,
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "strand",
                &mut std::io::stdout(),
            );
            exit_code::ExitCode::Success
        }
    };

    code.into()
}
