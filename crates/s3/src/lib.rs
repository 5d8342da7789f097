//! strand-s3: aws-sdk-s3 adapter for the strand core
//!
//! Implements [`strand_core::ObjectStore`] on top of the AWS SDK, with
//! path-style addressing for S3-compatible servers and canned-ACL and
//! SSE mapping.

mod client;

pub use client::S3Client;
