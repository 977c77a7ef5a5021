//! S3 Object Storage Implementation
//!
//! Implements the ObjectStorage trait for real AWS S3.

use crate::storage::{ObjectInfo, ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// S3-backed object storage
pub struct S3ObjectStorage {
    client: S3Client,
    region: String,
    bucket: String,
    prefix: String,
    /// Set once the bucket is known to exist; checked lazily on first write
    bucket_ready: OnceCell<()>,
}

impl S3ObjectStorage {
    /// Connect using the default AWS credential chain
    pub async fn connect(region: &str, bucket: &str, prefix: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::with_client(S3Client::new(&config), region, bucket, prefix)
    }

    /// Wrap an existing client
    pub fn with_client(client: S3Client, region: &str, bucket: &str, prefix: &str) -> Self {
        Self {
            client,
            region: region.to_string(),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            bucket_ready: OnceCell::new(),
        }
    }

    /// Create the bucket if it does not exist yet
    async fn ensure_bucket(&self) -> StorageResult<()> {
        self.bucket_ready
            .get_or_try_init(|| async {
                let exists = self
                    .client
                    .head_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .is_ok();

                if exists {
                    info!(event = "bucket_exists", bucket = %self.bucket, "Using existing S3 bucket");
                    return Ok(());
                }

                info!(event = "creating_bucket", bucket = %self.bucket, "Creating S3 bucket");

                // us-east-1 is special: it rejects an explicit LocationConstraint
                let request = self.client.create_bucket().bucket(&self.bucket);
                let request = if self.region == "us-east-1" {
                    request
                } else {
                    let constraint = BucketLocationConstraint::from(self.region.as_str());
                    let cfg = CreateBucketConfiguration::builder()
                        .location_constraint(constraint)
                        .build();
                    request.create_bucket_configuration(cfg)
                };

                match request.send().await {
                    Ok(_) => {
                        info!(event = "bucket_created", bucket = %self.bucket, region = %self.region, "Created S3 bucket");
                        Ok(())
                    }
                    Err(e) => {
                        let owned = e.as_service_error().is_some_and(|se| {
                            se.is_bucket_already_owned_by_you() || se.is_bucket_already_exists()
                        });
                        if owned {
                            info!(event = "bucket_exists_globally", bucket = %self.bucket, "Bucket already exists");
                            Ok(())
                        } else {
                            Err(StorageError::Backend(format!("Failed to create bucket: {}", e)))
                        }
                    }
                }
            })
            .await
            .map(|_| ())
    }

    /// Get the full S3 key for a given path
    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    /// Get bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.ensure_bucket().await?;

        let full_key = self.full_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("S3 put failed: {}", e)))?;

        debug!(bucket = %self.bucket, key = %full_key, "Put object to S3");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let full_key = self.full_key(key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound {
                        key: full_key.clone(),
                    }
                } else {
                    StorageError::Backend(format!("S3 get failed: {}", e))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to read S3 body: {}", e)))?;

        debug!(bucket = %self.bucket, key = %full_key, "Got object from S3");
        Ok(data.into_bytes())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let full_prefix = self.full_key(prefix);

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&full_prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::Backend(format!("S3 list failed: {}", e)))?;

            for object in response.contents.unwrap_or_default() {
                if let (Some(key), Some(size)) = (object.key, object.size) {
                    // Strip the prefix to return relative keys
                    let relative_key = match key.strip_prefix(&self.prefix) {
                        Some(rest) if !self.prefix.is_empty() => {
                            rest.trim_start_matches('/').to_string()
                        }
                        _ => key,
                    };

                    objects.push(ObjectInfo {
                        key: relative_key,
                        size: size.max(0) as u64,
                        last_modified: object
                            .last_modified
                            .and_then(|dt| {
                                chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
                            })
                            .unwrap_or_else(chrono::Utc::now),
                    });
                }
            }

            if response.is_truncated.unwrap_or(false) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        debug!(bucket = %self.bucket, prefix = %full_prefix, count = objects.len(), "Listed objects from S3");
        Ok(objects)
    }
}
