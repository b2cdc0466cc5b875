//! S3 destination adapter for objsync
//!
//! Implements the `objsync-core` [`Destination`](objsync_core::ports::Destination)
//! port on top of `aws-sdk-s3`. Works against AWS S3 and S3-compatible
//! stores (MinIO, LocalStack) via a custom endpoint with path-style
//! addressing.

mod destination;

pub use destination::S3Destination;
