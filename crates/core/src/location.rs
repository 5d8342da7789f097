//! Location parsing and path resolution
//!
//! A [`Location`] is the normalized form of a user-supplied path string:
//! either a key inside a bucket (`s3://bucket/key`) or a local filesystem
//! path (`file:///tmp/x`, `~/x`, `relative/x`, `/absolute/x`). Remote keys
//! always use forward slashes regardless of platform; local paths use the
//! native separator.
//!
//! Trailing-slash-ness of the original string is preserved verbatim.
//! Callers use it to distinguish "treat as directory" intent; `Location`
//! itself does not enforce it.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Scheme literal used when rendering remote locations
pub const REMOTE_SCHEME: &str = "s3";

/// Whether a location names a local file or a remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Local filesystem path
    Local,
    /// Object in a bucket
    Remote,
}

/// A parsed, normalized path endpoint
///
/// Immutable once constructed. For remote locations `path` carries a
/// leading `/` whenever segments follow the bucket and is empty for
/// bucket-only locations; [`Location::key`] strips that first slash to
/// produce the backend key. Doubled slashes inside a key are preserved:
/// object stores allow them and they are semantically significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    scheme: Scheme,
    bucket: String,
    path: String,
}

impl Location {
    /// Parse a raw location string
    ///
    /// `<scheme>://bucket[/key]` with any scheme other than `file` is
    /// remote. `file://` URIs and everything else are local: `~` expands
    /// to the home directory, relative paths resolve against the current
    /// working directory, and the empty string resolves to the working
    /// directory itself.
    pub fn parse(raw: &str) -> Result<Location> {
        if let Some((scheme, rest)) = split_scheme(raw) {
            if scheme.eq_ignore_ascii_case("file") {
                return parse_file_uri(raw);
            }
            let (bucket, path) = match rest.find('/') {
                Some(idx) => (&rest[..idx], &rest[idx..]),
                None => (rest, ""),
            };
            if bucket.is_empty() {
                return Err(Error::InvalidLocation(format!(
                    "remote location has an empty bucket: {raw}"
                )));
            }
            return Ok(Location {
                scheme: Scheme::Remote,
                bucket: bucket.to_string(),
                path: path.to_string(),
            });
        }

        parse_local(raw)
    }

    /// Construct a remote location from components
    pub fn remote(bucket: impl Into<String>, key: &str) -> Location {
        let path = if key.is_empty() {
            String::new()
        } else {
            format!("/{key}")
        };
        Location {
            scheme: Scheme::Remote,
            bucket: bucket.into(),
            path,
        }
    }

    /// Construct a local location from a filesystem path
    pub fn local(path: impl AsRef<Path>) -> Location {
        Location {
            scheme: Scheme::Local,
            bucket: String::new(),
            path: path.as_ref().to_string_lossy().into_owned(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.scheme == Scheme::Local
    }

    pub fn is_remote(&self) -> bool {
        self.scheme == Scheme::Remote
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Bucket name; empty for local locations
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The raw path component, exactly as parsed
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Backend object key: the remote path without its first slash
    ///
    /// Strips exactly one leading slash, so `s3://b//k` keeps its
    /// leading empty segment (`/k`).
    pub fn key(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }

    /// Local filesystem path for local locations
    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }

    /// Whether the original string ended with a separator, marking
    /// directory intent
    pub fn has_trailing_slash(&self) -> bool {
        self.path.ends_with('/') || self.path.ends_with(std::path::MAIN_SEPARATOR)
    }

    /// Join a child segment onto this location
    ///
    /// For remote locations the doubled slash is collapsed only at the
    /// join seam; doubled slashes elsewhere in either part are kept.
    /// Local locations use the native path join.
    pub fn join(&self, child: &str) -> Location {
        match self.scheme {
            Scheme::Remote => {
                let base = &self.path;
                let joined = if base.is_empty() {
                    format!("/{}", child.strip_prefix('/').unwrap_or(child))
                } else {
                    match (base.ends_with('/'), child.starts_with('/')) {
                        (true, true) => format!("{}{}", base, &child[1..]),
                        (false, false) => format!("{base}/{child}"),
                        _ => format!("{base}{child}"),
                    }
                };
                Location {
                    scheme: Scheme::Remote,
                    bucket: self.bucket.clone(),
                    path: joined,
                }
            }
            Scheme::Local => {
                let trimmed = child.trim_start_matches(['/', std::path::MAIN_SEPARATOR]);
                let joined = Path::new(&self.path).join(trimmed);
                Location {
                    scheme: Scheme::Local,
                    bucket: String::new(),
                    path: joined.to_string_lossy().into_owned(),
                }
            }
        }
    }

    /// Last path segment, if any
    pub fn basename(&self) -> Option<String> {
        match self.scheme {
            Scheme::Remote => self
                .path
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            Scheme::Local => Path::new(&self.path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        }
    }

    /// The location one segment up, if any
    pub fn parent(&self) -> Option<Location> {
        match self.scheme {
            Scheme::Remote => {
                let trimmed = self.path.trim_end_matches('/');
                let idx = trimmed.rfind('/')?;
                Some(Location {
                    scheme: Scheme::Remote,
                    bucket: self.bucket.clone(),
                    path: trimmed[..idx].to_string(),
                })
            }
            Scheme::Local => Path::new(&self.path).parent().map(Location::local),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scheme {
            Scheme::Remote => write!(f, "{REMOTE_SCHEME}://{}{}", self.bucket, self.path),
            Scheme::Local => write!(f, "{}", self.path),
        }
    }
}

/// Split `scheme://rest`, returning `None` unless `scheme` is a valid
/// URI scheme identifier
fn split_scheme(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.find("://")?;
    let scheme = &raw[..idx];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, &raw[idx + 3..]))
}

fn parse_file_uri(raw: &str) -> Result<Location> {
    let url = url::Url::parse(raw)
        .map_err(|e| Error::InvalidLocation(format!("bad file URI {raw}: {e}")))?;
    let mut path = url
        .to_file_path()
        .map_err(|_| Error::InvalidLocation(format!("file URI is not a valid path: {raw}")))?
        .to_string_lossy()
        .into_owned();
    if raw.ends_with('/') && !path.ends_with(std::path::MAIN_SEPARATOR) {
        path.push(std::path::MAIN_SEPARATOR);
    }
    Ok(Location {
        scheme: Scheme::Local,
        bucket: String::new(),
        path,
    })
}

fn parse_local(raw: &str) -> Result<Location> {
    let trailing = raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR);

    let expanded: PathBuf = if raw == "~" {
        home_dir()?
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home_dir()?.join(rest)
    } else {
        PathBuf::from(raw)
    };

    let absolute = if expanded.as_os_str().is_empty() {
        std::env::current_dir()?
    } else if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    let mut path = absolute.to_string_lossy().into_owned();
    if trailing && !path.ends_with(std::path::MAIN_SEPARATOR) {
        path.push(std::path::MAIN_SEPARATOR);
    }
    Ok(Location {
        scheme: Scheme::Local,
        bucket: String::new(),
        path,
    })
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::Config("cannot determine home directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        let loc = Location::parse("s3://bucket/some/key.txt").unwrap();
        assert!(loc.is_remote());
        assert_eq!(loc.bucket(), "bucket");
        assert_eq!(loc.path(), "/some/key.txt");
        assert_eq!(loc.key(), "some/key.txt");
    }

    #[test]
    fn test_parse_remote_bucket_only() {
        let loc = Location::parse("s3://bucket").unwrap();
        assert_eq!(loc.bucket(), "bucket");
        assert_eq!(loc.path(), "");
        assert_eq!(loc.key(), "");
    }

    #[test]
    fn test_parse_remote_empty_bucket_fails() {
        assert!(matches!(
            Location::parse("s3:///orphan/key"),
            Err(Error::InvalidLocation(_))
        ));
        assert!(matches!(
            Location::parse("s3://"),
            Err(Error::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_parse_preserves_trailing_slash() {
        let loc = Location::parse("s3://bucket/dir/").unwrap();
        assert_eq!(loc.path(), "/dir/");
        assert!(loc.has_trailing_slash());

        let loc = Location::parse("s3://bucket/file").unwrap();
        assert!(!loc.has_trailing_slash());
    }

    #[test]
    fn test_parse_preserves_internal_double_slash() {
        let loc = Location::parse("s3://bucket/a//b").unwrap();
        assert_eq!(loc.key(), "a//b");
        assert_eq!(loc.to_string(), "s3://bucket/a//b");
    }

    #[test]
    fn test_key_strips_single_leading_slash() {
        // A leading empty segment in the key is real and must survive
        let loc = Location::parse("s3://bucket//shadow").unwrap();
        assert_eq!(loc.key(), "/shadow");
    }

    #[test]
    fn test_display_round_trip() {
        for raw in [
            "s3://bucket/some/key.txt",
            "s3://bucket/dir/",
            "s3://bucket/a//b",
            "s3://bucket",
        ] {
            let loc = Location::parse(raw).unwrap();
            assert_eq!(loc.to_string(), raw, "round trip failed for {raw}");
        }
    }

    #[test]
    fn test_parse_local_absolute() {
        let loc = Location::parse("/tmp/data.bin").unwrap();
        assert!(loc.is_local());
        assert_eq!(loc.path(), "/tmp/data.bin");
        assert_eq!(loc.to_string(), "/tmp/data.bin");
    }

    #[test]
    fn test_parse_local_relative_resolves_to_cwd() {
        let loc = Location::parse("some/file.txt").unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert!(loc.as_path().starts_with(&cwd));
    }

    #[test]
    fn test_parse_empty_is_cwd() {
        let loc = Location::parse("").unwrap();
        assert_eq!(loc.as_path(), std::env::current_dir().unwrap().as_path());
    }

    #[test]
    fn test_parse_tilde() {
        let loc = Location::parse("~/notes.txt").unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(loc.as_path().starts_with(&home));
        assert!(loc.path().ends_with("notes.txt"));
    }

    #[test]
    fn test_parse_file_uri() {
        let loc = Location::parse("file:///var/log/syslog").unwrap();
        assert!(loc.is_local());
        assert_eq!(loc.path(), "/var/log/syslog");
    }

    #[test]
    fn test_parse_file_uri_decodes_escapes() {
        let loc = Location::parse("file:///tmp/a%20b").unwrap();
        assert_eq!(loc.path(), "/tmp/a b");
    }

    #[test]
    #[cfg(unix)]
    fn test_parse_file_uri_with_host_fails() {
        assert!(matches!(
            Location::parse("file://remote-host/tmp/x"),
            Err(Error::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_join_remote_seam_collapse() {
        let base = Location::parse("s3://bucket/prefix/").unwrap();
        assert_eq!(base.join("child").to_string(), "s3://bucket/prefix/child");
        assert_eq!(base.join("/child").to_string(), "s3://bucket/prefix/child");

        let no_slash = Location::parse("s3://bucket/prefix").unwrap();
        assert_eq!(
            no_slash.join("child").to_string(),
            "s3://bucket/prefix/child"
        );
    }

    #[test]
    fn test_join_remote_keeps_internal_doubles() {
        let base = Location::parse("s3://bucket/a//b/").unwrap();
        assert_eq!(base.join("c//d").to_string(), "s3://bucket/a//b/c//d");
    }

    #[test]
    fn test_join_bucket_only() {
        let base = Location::parse("s3://bucket").unwrap();
        assert_eq!(base.join("key").to_string(), "s3://bucket/key");
    }

    #[test]
    fn test_join_local() {
        let base = Location::parse("/tmp/dir").unwrap();
        assert_eq!(base.join("file.txt").as_path(), Path::new("/tmp/dir/file.txt"));
    }

    #[test]
    fn test_basename() {
        assert_eq!(
            Location::parse("s3://b/a/b/c.txt").unwrap().basename(),
            Some("c.txt".to_string())
        );
        assert_eq!(
            Location::parse("s3://b/dir/").unwrap().basename(),
            Some("dir".to_string())
        );
        assert_eq!(Location::parse("s3://b").unwrap().basename(), None);
        assert_eq!(
            Location::parse("/tmp/x.bin").unwrap().basename(),
            Some("x.bin".to_string())
        );
    }

    #[test]
    fn test_parent() {
        let loc = Location::parse("s3://b/a/b/c").unwrap();
        assert_eq!(loc.parent().unwrap().to_string(), "s3://b/a/b");

        let top = Location::parse("s3://b/a").unwrap();
        assert_eq!(top.parent().unwrap().to_string(), "s3://b");
    }

    #[test]
    fn test_unknown_scheme_is_remote() {
        let loc = Location::parse("gs://bucket/obj").unwrap();
        assert!(loc.is_remote());
        assert_eq!(loc.bucket(), "bucket");
    }

    #[test]
    fn test_scheme_like_local_path() {
        // No "://" marker, so this is a local path even with a colon
        let loc = Location::parse("/tmp/a:b").unwrap();
        assert!(loc.is_local());
    }
}
