//! rm command - Remove a file or object
//!
//! Removing an absent target is an error: callers rely on remove
//! confirming that something existed.

use clap::Args;
use serde::Serialize;
use strand_core::{Error, Location};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Remove a file or object
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Path to remove (local path or s3://bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    path: String,
    removed: bool,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig, profile: &str) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let location = match Location::parse(&args.path) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid path: {e}"));
            return ExitCode::UsageError;
        }
    };

    let result = if location.is_local() {
        tokio::fs::remove_file(location.as_path())
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::NotFound(location.to_string())
                } else {
                    Error::Io(e)
                }
            })
    } else {
        match super::build_copier(&[&location], profile).await {
            Ok(copier) => match copier.object_ref(&location) {
                Ok(obj) => obj.delete().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&RmOutput {
                    path: args.path.clone(),
                    removed: true,
                });
            } else {
                formatter.success(&format!("Removed {}", args.path));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rm_output_serialization() {
        let output = RmOutput {
            path: "s3://b/k".to_string(),
            removed: true,
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"removed\":true"));
    }
}
