//! AWS storage implementations
//!
//! Provides real S3 object storage for production deployments.

mod s3;

pub use s3::S3ObjectStorage;

use crate::storage::ObjectStorage;
use std::sync::Arc;

/// Create S3-backed object storage for the given bucket
///
/// Credentials come from the default AWS provider chain (environment
/// variables locally, the instance role when deployed).
pub async fn create_s3_storage(
    region: &str,
    bucket: &str,
    prefix: &str,
) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    let storage = S3ObjectStorage::connect(region, bucket, prefix).await;
    Ok(Arc::new(storage))
}
