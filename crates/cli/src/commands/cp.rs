//! cp command - Copy a file or object
//!
//! Copies between any combination of local paths and remote objects,
//! with overwrite policy, integrity verification, and upload shaping
//! (content type, encoding, gzip, ACL, encryption).

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use strand_core::{Acl, CopyOptions, CopyOutcome, Location};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Copy a file or object
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source path (local path or s3://bucket/key)
    pub source: String,

    /// Destination path; a trailing slash means "into this directory"
    pub destination: String,

    /// Overwrite an existing destination
    #[arg(long)]
    pub force: bool,

    /// Skip silently when the destination exists
    #[arg(long)]
    pub skip: bool,

    /// Verify a local destination by re-reading it
    #[arg(long)]
    pub validate: bool,

    /// Canned ACL for a remote destination: private, bucket-owner-read,
    /// public-read
    #[arg(long)]
    pub acl: Option<String>,

    /// Carry the source ACL over on a remote-to-remote copy
    #[arg(long)]
    pub preserve_acl: bool,

    /// Explicit content type for uploads
    #[arg(long)]
    pub content_type: Option<String>,

    /// Guess the content type from the source extension
    #[arg(long)]
    pub guess_content_type: bool,

    /// Explicit content encoding for uploads
    #[arg(long)]
    pub content_encoding: Option<String>,

    /// Gzip the body before upload
    #[arg(long)]
    pub gzip: bool,

    /// Disable server-side encryption for this upload
    #[arg(long)]
    pub no_encrypt: bool,

    /// Show a progress indicator
    #[arg(long)]
    pub progress: bool,
}

#[derive(Debug, Serialize)]
struct CpOutput {
    source: String,
    destination: String,
    outcome: &'static str,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, output_config: OutputConfig, profile: &str) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let source = match Location::parse(&args.source) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid source path: {e}"));
            return ExitCode::UsageError;
        }
    };
    let destination = match Location::parse(&args.destination) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid destination path: {e}"));
            return ExitCode::UsageError;
        }
    };

    let acl = match args.acl.as_deref().map(str::parse::<Acl>).transpose() {
        Ok(a) => a,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };

    let copier = match super::build_copier(&[&source, &destination], profile).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let options = CopyOptions {
        force: args.force,
        skip: args.skip,
        acl,
        preserve_acl: args.preserve_acl,
        content_type: args.content_type.clone(),
        content_encoding: args.content_encoding.clone(),
        guess_content_type: args.guess_content_type,
        gzip: args.gzip,
        encrypt: !args.no_encrypt,
        validate: args.validate,
        progress: args.progress,
    };

    let spinner = if args.progress && !formatter.is_json() && !formatter.is_quiet() {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Valid template"),
        );
        pb.set_message(format!("{} -> {}", args.source, args.destination));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = copier.copy(&source, &destination, &options).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match result {
        Ok(CopyOutcome::Copied) => {
            if formatter.is_json() {
                formatter.json(&CpOutput {
                    source: args.source,
                    destination: args.destination,
                    outcome: "copied",
                });
            } else {
                formatter.success(&format!("Copied {} to {}", args.source, args.destination));
            }
            ExitCode::Success
        }
        Ok(CopyOutcome::Skipped) => {
            if formatter.is_json() {
                formatter.json(&CpOutput {
                    source: args.source,
                    destination: args.destination,
                    outcome: "skipped",
                });
            } else {
                formatter.warning(&format!(
                    "Destination {} exists, skipped",
                    args.destination
                ));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}
