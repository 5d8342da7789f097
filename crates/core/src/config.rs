//! Configuration: endpoint profiles and retry/consistency tuning
//!
//! Profiles are named references to S3-compatible endpoints, persisted as
//! TOML under the user config directory (override with `STRAND_CONFIG_DIR`
//! for tests and sandboxed environments).
//!
//! Retry bounds and backoff durations are deliberately plain configuration
//! constants, tuned against observed provider behavior rather than
//! hard-coded invariants.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bounded-retry tuning for transient provider errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff sleep
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

/// Tuning for read-your-own-write visibility checks
///
/// Unlike [`RetryConfig`] the backoff here is fixed, not exponential:
/// the wait is for the provider's consistency window, which does not
/// shrink by asking more politely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// Total lookups, including the first
    pub max_attempts: u32,
    /// Sleep between lookups
    pub backoff_ms: u64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 100,
        }
    }
}

/// A named reference to an S3-compatible storage endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name; comes from the map key in the config file
    #[serde(skip)]
    pub name: String,

    /// Endpoint URL, e.g. `http://localhost:9000`
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl Profile {
    pub fn new(name: &str, endpoint: &str, access_key: &str, secret_key: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            region: default_region(),
            bucket_lookup: default_bucket_lookup(),
        }
    }
}

/// On-disk shape of the config file
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    profiles: BTreeMap<String, Profile>,
}

/// Loads and persists profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Open the default profile store
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os("STRAND_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?
                .join("strand"),
        };
        Ok(Self {
            path: dir.join("config.toml"),
        })
    }

    /// Path of the backing config file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> Result<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let mut file: ConfigFile =
            toml::from_str(&raw).map_err(|e| Error::Config(format!("bad config file: {e}")))?;
        for (name, profile) in file.profiles.iter_mut() {
            profile.name = name.clone();
        }
        Ok(file)
    }

    fn save(&self, file: &ConfigFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(file)
            .map_err(|e| Error::Config(format!("cannot serialize config: {e}")))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Look up one profile by name
    pub fn get(&self, name: &str) -> Result<Profile> {
        self.load()?
            .profiles
            .remove(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Add or replace a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        let mut file = self.load()?;
        file.profiles.insert(profile.name.clone(), profile);
        self.save(&file)
    }

    /// All profiles, sorted by name
    pub fn list(&self) -> Result<Vec<Profile>> {
        Ok(self.load()?.profiles.into_values().collect())
    }

    /// Remove a profile, failing if it does not exist
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut file = self.load()?;
        if file.profiles.remove(name).is_none() {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        self.save(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &std::path::Path) -> ProfileStore {
        ProfileStore {
            path: dir.join("config.toml"),
        }
    }

    #[test]
    fn test_retry_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_backoff_ms, 100);
    }

    #[test]
    fn test_profile_defaults() {
        let p = Profile::new("test", "http://localhost:9000", "ak", "sk");
        assert_eq!(p.region, "us-east-1");
        assert_eq!(p.bucket_lookup, "auto");
    }

    #[test]
    fn test_profile_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store
            .set(Profile::new("minio", "http://localhost:9000", "ak", "sk"))
            .unwrap();

        let loaded = store.get("minio").unwrap();
        assert_eq!(loaded.name, "minio");
        assert_eq!(loaded.endpoint, "http://localhost:9000");

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);

        store.remove("minio").unwrap();
        assert!(matches!(
            store.get("minio"),
            Err(Error::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_remove_missing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(matches!(
            store.remove("ghost"),
            Err(Error::ProfileNotFound(_))
        ));
    }
}
