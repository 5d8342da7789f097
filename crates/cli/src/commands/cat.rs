//! cat command - Write file or object contents to stdout
//!
//! Remote objects are staged to a private temp file first (the staging
//! copy is removed on exit), so stdout sees only complete content.

use std::io::Write;

use clap::Args;
use strand_core::{CachedFile, Location, OpenMode};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Print file or object contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Path to read (local path or s3://bucket/key)
    pub path: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, output_config: OutputConfig, profile: &str) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let location = match Location::parse(&args.path) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid path: {e}"));
            return ExitCode::UsageError;
        }
    };

    let copier = match super::build_copier(&[&location], profile).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let file = match CachedFile::open(&copier, &location, OpenMode::Read).await {
        Ok(f) => f,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let body = match file.read().await {
        Ok(b) => b,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    if let Err(e) = std::io::stdout().write_all(&body) {
        formatter.error(&format!("Writing to stdout failed: {e}"));
        return ExitCode::GeneralError;
    }

    if let Err(e) = file.close().await {
        formatter.error(&e.to_string());
        return ExitCode::from_error(&e);
    }

    ExitCode::Success
}
