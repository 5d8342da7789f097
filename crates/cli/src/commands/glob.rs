//! glob command - Expand a pattern against a directory or prefix
//!
//! Remote patterns are matched client-side: the static part of the key
//! narrows the listing, the rest goes through glob matching.

use clap::Args;
use serde::Serialize;
use strand_core::{Error, Location, list_all};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Expand a glob pattern
#[derive(Args, Debug)]
pub struct GlobArgs {
    /// Pattern to expand (e.g. 'logs/*.gz' or 's3://bucket/logs/*.gz')
    pub pattern: String,

    /// Print only the match count
    #[arg(long)]
    pub count: bool,
}

#[derive(Debug, Serialize)]
struct GlobOutput {
    pattern: String,
    matches: Vec<String>,
    count: usize,
}

/// Execute the glob command
pub async fn execute(args: GlobArgs, output_config: OutputConfig, profile: &str) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let matches = if args.pattern.contains("://") && !args.pattern.starts_with("file://") {
        expand_remote(&args.pattern, profile).await
    } else {
        expand_local(&args.pattern)
    };

    let matches = match matches {
        Ok(m) => m,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&GlobOutput {
            pattern: args.pattern,
            count: matches.len(),
            matches,
        });
        return ExitCode::Success;
    }

    if args.count {
        formatter.println(&format!("{}", matches.len()));
    } else {
        for m in &matches {
            formatter.println(m);
        }
    }

    ExitCode::Success
}

/// The key prefix before the first glob metacharacter, cut at the last
/// path separator so the listing stays narrow but complete
fn static_prefix(pattern: &str) -> &str {
    let meta = pattern
        .find(['*', '?', '['])
        .unwrap_or(pattern.len());
    let cut = pattern[..meta].rfind('/').map(|i| i + 1).unwrap_or(0);
    &pattern[..cut]
}

async fn expand_remote(pattern: &str, profile: &str) -> strand_core::Result<Vec<String>> {
    // The static part of the pattern is a valid location on its own
    let prefix_raw: String = {
        let scheme_end = pattern.find("://").expect("checked by caller") + 3;
        let (head, key_pattern) = pattern.split_at(scheme_end);
        format!("{head}{}", static_prefix(key_pattern))
    };
    let base = Location::parse(&prefix_raw)?;

    let copier = super::build_copier(&[&base], profile).await?;
    let store = copier.store()?;

    let key_pattern = Location::parse(pattern)?;
    let matcher = glob::Pattern::new(key_pattern.key())
        .map_err(|e| Error::InvalidLocation(format!("bad glob pattern: {e}")))?;

    let entries = list_all(store.as_ref(), base.bucket(), base.key()).await?;
    Ok(entries
        .into_iter()
        .filter(|e| matcher.matches(&e.key))
        .map(|e| Location::remote(base.bucket(), &e.key).to_string())
        .collect())
}

fn expand_local(pattern: &str) -> strand_core::Result<Vec<String>> {
    let paths = glob::glob(pattern)
        .map_err(|e| Error::InvalidLocation(format!("bad glob pattern: {e}")))?;

    let mut matches = Vec::new();
    for path in paths {
        let path = path.map_err(|e| Error::General(format!("glob walk: {e}")))?;
        matches.push(path.to_string_lossy().into_owned());
    }
    matches.sort();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_prefix() {
        assert_eq!(static_prefix("logs/2024/*.gz"), "logs/2024/");
        assert_eq!(static_prefix("*.gz"), "");
        assert_eq!(static_prefix("logs/a?.txt"), "logs/");
        assert_eq!(static_prefix("exact/name.txt"), "exact/");
    }

    #[test]
    fn test_expand_local() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.log"), b"1").unwrap();
        std::fs::write(dir.path().join("two.log"), b"2").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"3").unwrap();

        let pattern = format!("{}/*.log", dir.path().display());
        let matches = expand_local(&pattern).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].ends_with("one.log"));
        assert!(matches[1].ends_with("two.log"));
    }
}
