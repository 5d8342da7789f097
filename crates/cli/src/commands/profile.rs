//! Profile management commands
//!
//! Profiles are named references to S3-compatible storage endpoints,
//! including connection details and credentials.

use clap::Subcommand;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use strand_core::{Profile, ProfileStore};

/// Profile subcommands for managing storage service connections
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "default", "minio", "prod")
    pub name: String,

    /// S3 endpoint URL (e.g., `http://localhost:9000`, `https://s3.amazonaws.com`)
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// AWS region (default: us-east-1)
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns (default: auto)
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: String,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details including endpoints
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// JSON output for profile list
#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

/// Profile information for JSON output (without sensitive data)
#[derive(Serialize)]
struct ProfileInfo {
    name: String,
    endpoint: String,
    region: String,
    bucket_lookup: String,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            endpoint: profile.endpoint.clone(),
            region: profile.region.clone(),
            bucket_lookup: profile.bucket_lookup.clone(),
        }
    }
}

/// JSON output for profile set/remove operations
#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let store = match ProfileStore::new() {
        Ok(s) => s,
        Err(e) => {
            formatter.error(&format!("Failed to open profile store: {e}"));
            return ExitCode::GeneralError;
        }
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &store, &formatter).await,
        ProfileCommands::List(args) => execute_list(args, &store, &formatter).await,
        ProfileCommands::Remove(args) => execute_remove(args, &store, &formatter).await,
    }
}

async fn execute_set(args: SetArgs, store: &ProfileStore, formatter: &Formatter) -> ExitCode {
    // Validate inputs
    if args.name.is_empty() {
        formatter.error("Profile name cannot be empty");
        return ExitCode::UsageError;
    }

    if args.endpoint.is_empty() {
        formatter.error("Endpoint URL cannot be empty");
        return ExitCode::UsageError;
    }

    // Validate bucket lookup
    if args.bucket_lookup != "auto" && args.bucket_lookup != "path" && args.bucket_lookup != "dns" {
        formatter.error("Bucket lookup must be 'auto', 'path', or 'dns'");
        return ExitCode::UsageError;
    }

    // Create profile
    let mut profile = Profile::new(
        &args.name,
        &args.endpoint,
        &args.access_key,
        &args.secret_key,
    );
    profile.region = args.region;
    profile.bucket_lookup = args.bucket_lookup;

    // Save profile
    match store.set(profile) {
        Ok(()) => {
            if formatter.is_json() {
                let output = ProfileOperationOutput {
                    success: true,
                    profile: args.name.clone(),
                    message: format!("Profile '{}' configured successfully", args.name),
                };
                formatter.json(&output);
            } else {
                let styled_name = formatter.style_name(&args.name);
                formatter.success(&format!("Profile '{styled_name}' configured successfully."));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::GeneralError
        }
    }
}

async fn execute_list(args: ListArgs, store: &ProfileStore, formatter: &Formatter) -> ExitCode {
    match store.list() {
        Ok(profiles) => {
            if formatter.is_json() {
                let output = ProfileListOutput {
                    profiles: profiles.iter().map(ProfileInfo::from).collect(),
                };
                formatter.json(&output);
            } else if profiles.is_empty() {
                formatter.println("No profiles configured.");
            } else if args.long {
                // Long format with details
                for profile in &profiles {
                    let styled_name = formatter.style_name(&format!("{:<12}", profile.name));
                    let styled_url = formatter.style_url(&profile.endpoint);
                    let styled_region = formatter.style_date(&profile.region);
                    let styled_lookup = formatter.style_date(&profile.bucket_lookup);
                    formatter.println(&format!(
                        "{styled_name} {styled_url} (region: {styled_region}, lookup: {styled_lookup})"
                    ));
                }
            } else {
                // Short format
                for profile in &profiles {
                    let styled_name = formatter.style_name(&format!("{:<12}", profile.name));
                    let styled_url = formatter.style_url(&profile.endpoint);
                    formatter.println(&format!("{styled_name} {styled_url}"));
                }
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::GeneralError
        }
    }
}

async fn execute_remove(
    args: RemoveArgs,
    store: &ProfileStore,
    formatter: &Formatter,
) -> ExitCode {
    match store.remove(&args.name) {
        Ok(()) => {
            if formatter.is_json() {
                let output = ProfileOperationOutput {
                    success: true,
                    profile: args.name.clone(),
                    message: format!("Profile '{}' removed successfully", args.name),
                };
                formatter.json(&output);
            } else {
                let styled_name = formatter.style_name(&args.name);
                formatter.success(&format!("Profile '{styled_name}' removed successfully."));
            }
            ExitCode::Success
        }
        Err(strand_core::Error::ProfileNotFound(_)) => {
            formatter.error(&format!("Profile '{}' not found", args.name));
            ExitCode::NotFound
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_args_defaults() {
        // Verify default values are applied correctly
        let args = SetArgs {
            name: "test".to_string(),
            endpoint: "http://localhost:9000".to_string(),
            access_key: "accesskey".to_string(),
            secret_key: "secretkey".to_string(),
            region: "us-east-1".to_string(),
            bucket_lookup: "auto".to_string(),
        };

        assert_eq!(args.region, "us-east-1");
        assert_eq!(args.bucket_lookup, "auto");
    }

    #[test]
    fn test_profile_info_from_profile() {
        let profile = Profile::new("test", "http://localhost:9000", "key", "secret");
        let info = ProfileInfo::from(&profile);

        assert_eq!(info.name, "test");
        assert_eq!(info.endpoint, "http://localhost:9000");
        assert_eq!(info.region, "us-east-1");
    }
}
