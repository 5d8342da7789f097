//! Directory-tree reconciliation
//!
//! Walks two trees (either side may be remote), decides one action per
//! relative path, then fans the actions out with bounded parallelism.
//! There is no cross-path ordering and no all-or-nothing transaction:
//! one path's failure never blocks the others, and the result is a
//! per-path outcome report.

use std::collections::{BTreeSet, HashMap};

use futures::StreamExt;
use serde::Serialize;

use crate::copy::{Copier, CopyOptions, CopyOutcome};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::store::list_all;

/// Reconciliation policy
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Remove destination entries with no source counterpart
    pub delete: bool,
    /// Overwrite destination entries whose source is strictly newer
    pub update: bool,
    /// Overwrite every entry present on both sides, regardless of times
    pub force: bool,
    /// Concurrent per-path operations
    pub parallel: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            delete: false,
            update: false,
            force: false,
            parallel: 4,
        }
    }
}

/// Decision for one relative path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Copy,
    Delete,
    Skip,
}

/// The per-path plan, computed before any I/O is issued
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlanEntry {
    pub relative_path: String,
    pub action: SyncAction,
}

/// What actually happened to one path
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Copied,
    Deleted,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncEntryReport {
    pub path: String,
    pub outcome: SyncOutcome,
}

/// Full result of a sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub entries: Vec<SyncEntryReport>,
    pub copied: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    fn tally(entries: Vec<SyncEntryReport>) -> Self {
        let mut report = SyncReport {
            entries,
            ..Default::default()
        };
        for entry in &report.entries {
            match entry.outcome {
                SyncOutcome::Copied => report.copied += 1,
                SyncOutcome::Deleted => report.deleted += 1,
                SyncOutcome::Skipped => report.skipped += 1,
                SyncOutcome::Failed(_) => report.failed += 1,
            }
        }
        report
    }
}

#[derive(Debug, Clone)]
struct TreeEntry {
    modified: Option<jiff::Timestamp>,
}

/// Reconciles a source tree onto a destination tree
#[derive(Clone)]
pub struct Syncer {
    copier: Copier,
}

impl Syncer {
    pub fn new(copier: Copier) -> Self {
        Self { copier }
    }

    /// Compute the per-path plan without performing any transfer
    pub async fn plan(
        &self,
        source_dir: &Location,
        dest_dir: &Location,
        options: &SyncOptions,
    ) -> Result<Vec<SyncPlanEntry>> {
        let source = self.list_tree(source_dir, true).await?;
        let dest = self.list_tree(dest_dir, false).await?;

        let mut paths: BTreeSet<&String> = source.keys().collect();
        paths.extend(dest.keys());

        let mut plan = Vec::with_capacity(paths.len());
        for path in paths {
            let action = match (source.get(path), dest.get(path)) {
                (Some(_), None) => SyncAction::Copy,
                (None, Some(_)) => {
                    if options.delete {
                        SyncAction::Delete
                    } else {
                        SyncAction::Skip
                    }
                }
                (Some(src), Some(dst)) => {
                    if options.force {
                        SyncAction::Copy
                    } else if options.update && newer(src, dst) {
                        SyncAction::Copy
                    } else {
                        // Present on both sides: never silently
                        // overwritten unless explicitly told to update
                        SyncAction::Skip
                    }
                }
                (None, None) => unreachable!("path came from one of the two trees"),
            };
            plan.push(SyncPlanEntry {
                relative_path: path.clone(),
                action,
            });
        }
        Ok(plan)
    }

    /// Reconcile `dest_dir` with `source_dir`
    pub async fn sync(
        &self,
        source_dir: &Location,
        dest_dir: &Location,
        options: &SyncOptions,
    ) -> Result<SyncReport> {
        let plan = self.plan(source_dir, dest_dir, options).await?;
        self.execute(source_dir, dest_dir, plan, options.parallel.max(1))
            .await
    }

    /// Run an already-computed plan
    pub async fn execute(
        &self,
        source_dir: &Location,
        dest_dir: &Location,
        plan: Vec<SyncPlanEntry>,
        parallel: usize,
    ) -> Result<SyncReport> {
        let entries: Vec<SyncEntryReport> = futures::stream::iter(plan)
            .map(|entry| self.execute_entry(source_dir, dest_dir, entry))
            .buffer_unordered(parallel)
            .collect()
            .await;
        Ok(SyncReport::tally(entries))
    }

    async fn execute_entry(
        &self,
        source_dir: &Location,
        dest_dir: &Location,
        entry: SyncPlanEntry,
    ) -> SyncEntryReport {
        let outcome = match entry.action {
            SyncAction::Skip => SyncOutcome::Skipped,
            SyncAction::Copy => {
                let src = source_dir.join(&entry.relative_path);
                let dst = dest_dir.join(&entry.relative_path);
                // The plan already decided the overwrite, so the normal
                // destination guard is bypassed.
                let options = CopyOptions {
                    force: true,
                    ..Default::default()
                };
                match self.copier.copy(&src, &dst, &options).await {
                    Ok(CopyOutcome::Copied | CopyOutcome::Skipped) => SyncOutcome::Copied,
                    Err(e) => {
                        tracing::warn!(path = %entry.relative_path, error = %e, "sync copy failed");
                        SyncOutcome::Failed(e.to_string())
                    }
                }
            }
            SyncAction::Delete => {
                let target = dest_dir.join(&entry.relative_path);
                let result = if target.is_local() {
                    tokio::fs::remove_file(target.as_path())
                        .await
                        .map_err(Error::Io)
                } else {
                    match self.copier.object_ref(&target) {
                        Ok(obj) => obj.delete().await,
                        Err(e) => Err(e),
                    }
                };
                match result {
                    Ok(()) => SyncOutcome::Deleted,
                    Err(e) => {
                        tracing::warn!(path = %entry.relative_path, error = %e, "sync delete failed");
                        SyncOutcome::Failed(e.to_string())
                    }
                }
            }
        };

        SyncEntryReport {
            path: entry.relative_path,
            outcome,
        }
    }

    /// Relative paths (forward-slash separated) and mtimes for one side
    async fn list_tree(
        &self,
        dir: &Location,
        is_source: bool,
    ) -> Result<HashMap<String, TreeEntry>> {
        if dir.is_local() {
            list_local_tree(dir, is_source)
        } else {
            self.list_remote_tree(dir).await
        }
    }

    async fn list_remote_tree(&self, dir: &Location) -> Result<HashMap<String, TreeEntry>> {
        let store = self.copier.store()?;
        let prefix = normalized_prefix(dir.key());
        let entries = list_all(store.as_ref(), dir.bucket(), &prefix).await?;

        let mut tree = HashMap::new();
        for entry in entries {
            let relative = entry
                .key
                .strip_prefix(&prefix)
                .unwrap_or(&entry.key)
                .trim_start_matches('/')
                .to_string();
            if relative.is_empty() {
                continue;
            }
            tree.insert(
                relative,
                TreeEntry {
                    modified: entry.last_modified,
                },
            );
        }
        Ok(tree)
    }
}

/// Non-empty prefixes get a trailing slash so sibling keys sharing the
/// prefix text do not leak into the listing
fn normalized_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{key}/")
    }
}

fn list_local_tree(dir: &Location, is_source: bool) -> Result<HashMap<String, TreeEntry>> {
    let root = dir.as_path();
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(Error::InvalidLocation(format!("{dir} is not a directory")));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // A missing destination is simply empty; a missing source
            // has nothing to offer
            return if is_source {
                Err(Error::SourceNotFound(dir.to_string()))
            } else {
                Ok(HashMap::new())
            };
        }
        Err(e) => return Err(Error::Io(e)),
    }

    let mut tree = HashMap::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(|e| Error::General(format!("walking {dir}: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::General(format!("relativizing {}: {e}", entry.path().display())))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|st| jiff::Timestamp::try_from(st).ok());

        tree.insert(relative, TreeEntry { modified });
    }
    Ok(tree)
}

fn newer(src: &TreeEntry, dst: &TreeEntry) -> bool {
    match (src.modified, dst.modified) {
        (Some(s), Some(d)) => s > d,
        // Without both timestamps there is no basis to overwrite
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(secs: i64) -> TreeEntry {
        TreeEntry {
            modified: jiff::Timestamp::from_second(secs).ok(),
        }
    }

    #[test]
    fn test_newer_comparison() {
        assert!(newer(&entry(200), &entry(100)));
        assert!(!newer(&entry(100), &entry(100)));
        assert!(!newer(&entry(100), &entry(200)));
        assert!(!newer(&TreeEntry { modified: None }, &entry(100)));
    }

    #[test]
    fn test_normalized_prefix() {
        assert_eq!(normalized_prefix(""), "");
        assert_eq!(normalized_prefix("a/b"), "a/b/");
        assert_eq!(normalized_prefix("a/b/"), "a/b/");
    }

    #[tokio::test]
    async fn test_plan_classification() {
        let dir = tempfile::tempdir().unwrap();
        let src_root = dir.path().join("src");
        let dst_root = dir.path().join("dst");
        std::fs::create_dir_all(src_root.join("sub")).unwrap();
        std::fs::create_dir_all(&dst_root).unwrap();
        std::fs::write(src_root.join("only-src.txt"), b"a").unwrap();
        std::fs::write(src_root.join("sub/both.txt"), b"b").unwrap();
        std::fs::write(dst_root.join("only-dst.txt"), b"c").unwrap();
        std::fs::create_dir_all(dst_root.join("sub")).unwrap();
        std::fs::write(dst_root.join("sub/both.txt"), b"b").unwrap();

        let syncer = Syncer::new(Copier::local());
        let source = Location::local(&src_root);
        let dest = Location::local(&dst_root);

        let plan = syncer
            .plan(
                &source,
                &dest,
                &SyncOptions {
                    delete: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let by_path: HashMap<&str, SyncAction> = plan
            .iter()
            .map(|e| (e.relative_path.as_str(), e.action))
            .collect();

        assert_eq!(by_path["only-src.txt"], SyncAction::Copy);
        assert_eq!(by_path["only-dst.txt"], SyncAction::Delete);
        assert_eq!(by_path["sub/both.txt"], SyncAction::Skip);
    }

    #[tokio::test]
    async fn test_plan_without_delete_skips_extras() {
        let dir = tempfile::tempdir().unwrap();
        let src_root = dir.path().join("src");
        let dst_root = dir.path().join("dst");
        std::fs::create_dir_all(&src_root).unwrap();
        std::fs::create_dir_all(&dst_root).unwrap();
        std::fs::write(dst_root.join("extra.txt"), b"x").unwrap();

        let syncer = Syncer::new(Copier::local());
        let plan = syncer
            .plan(
                &Location::local(&src_root),
                &Location::local(&dst_root),
                &SyncOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].action, SyncAction::Skip);
    }

    #[tokio::test]
    async fn test_missing_source_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let syncer = Syncer::new(Copier::local());
        let result = syncer
            .plan(
                &Location::local(dir.path().join("nope")),
                &Location::local(dir.path()),
                &SyncOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(Error::SourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_local_sync_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let src_root = dir.path().join("src");
        let dst_root = dir.path().join("dst");
        std::fs::create_dir_all(src_root.join("nested")).unwrap();
        std::fs::write(src_root.join("top.txt"), b"top").unwrap();
        std::fs::write(src_root.join("nested/deep.txt"), b"deep").unwrap();

        let syncer = Syncer::new(Copier::local());
        let report = syncer
            .sync(
                &Location::local(&src_root),
                &Location::local(&dst_root),
                &SyncOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.copied, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(std::fs::read(dst_root.join("top.txt")).unwrap(), b"top");
        assert_eq!(
            std::fs::read(dst_root.join("nested/deep.txt")).unwrap(),
            b"deep"
        );
    }
}
