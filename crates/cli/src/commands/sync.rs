//! sync command - Reconcile two directory trees
//!
//! Copies new and (with --update) newer entries from source to target,
//! optionally removing target entries with no source counterpart. Every
//! path gets its own outcome; one failure never aborts the rest.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use strand_core::{Location, SyncAction, SyncOptions, SyncOutcome, Syncer};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Synchronize two directory trees
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source tree (local directory or s3://bucket/prefix)
    pub source: String,

    /// Target tree (local directory or s3://bucket/prefix)
    pub target: String,

    /// Remove target entries with no source counterpart
    #[arg(long)]
    pub delete: bool,

    /// Overwrite target entries whose source is strictly newer
    #[arg(long)]
    pub update: bool,

    /// Overwrite every entry present on both sides
    #[arg(long)]
    pub force: bool,

    /// Show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of parallel operations
    #[arg(short = 'P', long, default_value = "4")]
    pub parallel: usize,
}

#[derive(Debug, Serialize)]
struct SyncOutput {
    source: String,
    target: String,
    copied: usize,
    removed: usize,
    skipped: usize,
    errors: usize,
    dry_run: bool,
}

/// Execute the sync command
pub async fn execute(args: SyncArgs, output_config: OutputConfig, profile: &str) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let source = match Location::parse(&args.source) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid source path: {e}"));
            return ExitCode::UsageError;
        }
    };
    let target = match Location::parse(&args.target) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid target path: {e}"));
            return ExitCode::UsageError;
        }
    };

    let copier = match super::build_copier(&[&source, &target], profile).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };
    let syncer = Syncer::new(copier);

    let options = SyncOptions {
        delete: args.delete,
        update: args.update,
        force: args.force,
        parallel: args.parallel,
    };

    if args.dry_run {
        let plan = match syncer.plan(&source, &target, &options).await {
            Ok(p) => p,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::from_error(&e);
            }
        };

        let copies = plan.iter().filter(|e| e.action == SyncAction::Copy).count();
        let deletes = plan
            .iter()
            .filter(|e| e.action == SyncAction::Delete)
            .count();
        let skips = plan.iter().filter(|e| e.action == SyncAction::Skip).count();

        if formatter.is_json() {
            formatter.json(&SyncOutput {
                source: args.source,
                target: args.target,
                copied: copies,
                removed: deletes,
                skipped: skips,
                errors: 0,
                dry_run: true,
            });
        } else {
            formatter.println("Dry run mode - no changes will be made:");
            for entry in &plan {
                match entry.action {
                    SyncAction::Copy => formatter.println(&format!("  + {}", entry.relative_path)),
                    SyncAction::Delete => {
                        formatter.println(&format!("  - {}", entry.relative_path))
                    }
                    SyncAction::Skip => {}
                }
            }
            formatter.println(&format!(
                "Summary: {copies} to copy, {deletes} to remove, {skips} skipped"
            ));
        }
        return ExitCode::Success;
    }

    let spinner = if !formatter.is_json() && !formatter.is_quiet() {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Valid template"),
        );
        pb.set_message("Syncing...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let report = syncer.sync(&source, &target, &options).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let report = match report {
        Ok(r) => r,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&SyncOutput {
            source: args.source,
            target: args.target,
            copied: report.copied,
            removed: report.deleted,
            skipped: report.skipped,
            errors: report.failed,
            dry_run: false,
        });
    } else {
        for entry in &report.entries {
            match &entry.outcome {
                SyncOutcome::Copied => formatter.println(&format!("+ {}", entry.path)),
                SyncOutcome::Deleted => formatter.println(&format!("- {}", entry.path)),
                SyncOutcome::Skipped => {}
                SyncOutcome::Failed(reason) => {
                    formatter.error(&format!("Failed {}: {reason}", entry.path))
                }
            }
        }
        formatter.println(&format!(
            "Sync complete: {} copied, {} removed, {} skipped, {} errors",
            report.copied, report.deleted, report.skipped, report.failed
        ));
    }

    if report.failed > 0 {
        ExitCode::GeneralError
    } else {
        ExitCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_args_defaults() {
        let args = SyncArgs {
            source: "src".to_string(),
            target: "dst".to_string(),
            delete: false,
            update: false,
            force: false,
            dry_run: false,
            parallel: 4,
        };
        assert_eq!(args.parallel, 4);
        assert!(!args.delete);
        assert!(!args.update);
    }

    #[test]
    fn test_sync_output_serialization() {
        let output = SyncOutput {
            source: "src/".to_string(),
            target: "dst/".to_string(),
            copied: 10,
            removed: 2,
            skipped: 5,
            errors: 0,
            dry_run: false,
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"copied\":10"));
        assert!(json.contains("\"removed\":2"));
        assert!(json.contains("\"dry_run\":false"));
    }
}
