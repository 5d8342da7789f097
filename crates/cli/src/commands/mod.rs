//! Command implementations

pub mod cat;
pub mod cp;
pub mod glob;
pub mod ls;
pub mod profile;
pub mod rm;
pub mod sync;

use std::sync::Arc;

use strand_core::{Copier, Location, ProfileStore, Result};
use strand_s3::S3Client;

/// Build a copier able to serve the given locations
///
/// Purely local invocations need no endpoint; as soon as a remote
/// location is involved, the named profile is loaded and an S3 client
/// constructed from it.
pub(crate) async fn build_copier(locations: &[&Location], profile_name: &str) -> Result<Copier> {
    if locations.iter().all(|l| l.is_local()) {
        return Ok(Copier::local());
    }

    let profile = ProfileStore::new()?.get(profile_name)?;
    let client = S3Client::new(profile).await?;
    Ok(Copier::new(Arc::new(client)))
}
