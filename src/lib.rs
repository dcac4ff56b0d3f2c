//! Twitter/X timeline export job.
//!
//! Fetches the most recent posts of a fixed account, normalizes them into CSV
//! rows and uploads the file to S3. Meant to be run by an external scheduler;
//! a failed run is reported through the process exit status.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod job;
pub mod s3;
pub mod sink;
pub mod transform;
pub mod twitter;
