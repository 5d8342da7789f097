//! ls command - List a directory or object prefix
//!
//! Non-recursive remote listings are delimited at `/`, so nested keys
//! come back folded into directory entries.

use clap::Args;
use comfy_table::{Table, presets};
use serde::Serialize;
use strand_core::{ListOptions, Location, list_all};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List a directory or object prefix
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Path to list (local directory or s3://bucket[/prefix])
    #[arg(default_value = "")]
    pub path: String,

    /// Long format with sizes and timestamps
    #[arg(short, long)]
    pub long: bool,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    path: String,
    entries: Vec<EntryInfo>,
}

#[derive(Debug, Serialize)]
struct EntryInfo {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    is_dir: bool,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig, profile: &str) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let location = match Location::parse(&args.path) {
        Ok(l) => l,
        Err(e) => {
            formatter.error(&format!("Invalid path: {e}"));
            return ExitCode::UsageError;
        }
    };

    let entries = if location.is_local() {
        list_local(&location, args.recursive)
    } else {
        list_remote(&location, args.recursive, profile).await
    };

    let entries = match entries {
        Ok(e) => e,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&LsOutput {
            path: args.path,
            entries,
        });
        return ExitCode::Success;
    }

    if args.long {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING);
        for entry in &entries {
            let size = entry
                .size_bytes
                .map(|s| humansize::format_size(s, humansize::BINARY))
                .unwrap_or_default();
            let date = entry.last_modified.clone().unwrap_or_default();
            let name = if entry.is_dir {
                formatter.style_dir(&entry.key)
            } else {
                formatter.style_file(&entry.key)
            };
            table.add_row(vec![
                formatter.style_size(&size),
                formatter.style_date(&date),
                name,
            ]);
        }
        formatter.println(&table.to_string());
    } else {
        for entry in &entries {
            if entry.is_dir {
                formatter.println(&formatter.style_dir(&entry.key));
            } else {
                formatter.println(&entry.key);
            }
        }
    }

    ExitCode::Success
}

async fn list_remote(
    location: &Location,
    recursive: bool,
    profile: &str,
) -> strand_core::Result<Vec<EntryInfo>> {
    let copier = super::build_copier(&[location], profile).await?;
    let store = copier.store()?;
    let prefix = location.key();

    let entries = if recursive {
        list_all(store.as_ref(), location.bucket(), prefix).await?
    } else {
        let mut collected = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let page = store
                .list(
                    location.bucket(),
                    prefix,
                    ListOptions {
                        recursive: false,
                        max_keys: Some(1000),
                        continuation_token: continuation_token.clone(),
                    },
                )
                .await?;
            collected.extend(page.entries);
            if page.truncated {
                continuation_token = page.continuation_token;
            } else {
                break;
            }
        }
        collected
    };

    Ok(entries
        .into_iter()
        .map(|e| EntryInfo {
            size_bytes: (!e.is_dir).then_some(e.size),
            last_modified: e.last_modified.map(|t| t.to_string()),
            is_dir: e.is_dir,
            key: e.key,
        })
        .collect())
}

fn list_local(location: &Location, recursive: bool) -> strand_core::Result<Vec<EntryInfo>> {
    let root = location.as_path();
    let mut entries = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(root).min_depth(1) {
            let entry =
                entry.map_err(|e| strand_core::Error::General(format!("walking {location}: {e}")))?;
            entries.push(entry_info(
                entry.path().strip_prefix(root).unwrap_or(entry.path()),
                &entry.metadata().ok(),
                entry.file_type().is_dir(),
            ));
        }
    } else {
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let meta = entry.metadata().ok();
            let is_dir = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
            entries.push(entry_info(
                std::path::Path::new(&entry.file_name()),
                &meta,
                is_dir,
            ));
        }
    }

    entries.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(entries)
}

fn entry_info(path: &std::path::Path, meta: &Option<std::fs::Metadata>, is_dir: bool) -> EntryInfo {
    let modified = meta
        .as_ref()
        .and_then(|m| m.modified().ok())
        .and_then(|st| jiff::Timestamp::try_from(st).ok());
    EntryInfo {
        key: path.to_string_lossy().into_owned(),
        size_bytes: match meta {
            Some(m) if !is_dir => Some(m.len()),
            _ => None,
        },
        last_modified: modified.map(|t| t.to_string()),
        is_dir,
    }
}
