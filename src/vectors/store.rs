//! Index persistence on top of object storage

use super::format::{decode_matrix, encode_matrix};
use super::metadata::{decode_jsonl, encode_jsonl, IndexRecord};
use super::VectorMatrix;
use crate::defaults::{METADATA_OBJECT, VECTORS_OBJECT};
use crate::error::{Result, RetrievalError};
use crate::storage::{ObjectStorage, StorageError, StorageResult};
use bytes::Bytes;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Reads and writes whole vector indexes
pub struct VectorStore {
    storage: Arc<dyn ObjectStorage>,
    timeout: Duration,
}

impl VectorStore {
    pub fn new(storage: Arc<dyn ObjectStorage>, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    pub fn vectors_key(index_name: &str) -> String {
        format!("{}/{}", index_name, VECTORS_OBJECT)
    }

    pub fn metadata_key(index_name: &str) -> String {
        format!("{}/{}", index_name, METADATA_OBJECT)
    }

    /// Bound a storage call by the configured timeout
    async fn bounded<T>(
        &self,
        op: &'static str,
        key: &str,
        fut: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout {
                op,
                key: key.to_string(),
                secs: self.timeout.as_secs(),
            })?
    }

    /// Fetch both blobs of an index, fully materialized
    ///
    /// Row-count agreement is not checked here; the cache owns that decision.
    pub async fn fetch(&self, index_name: &str) -> Result<(VectorMatrix, Vec<IndexRecord>)> {
        let vec_key = Self::vectors_key(index_name);
        let meta_key = Self::metadata_key(index_name);

        let (vec_blob, meta_blob) = tokio::try_join!(
            self.bounded("get", &vec_key, self.storage.get(&vec_key)),
            self.bounded("get", &meta_key, self.storage.get(&meta_key)),
        )?;

        let vectors = decode_matrix(&vec_blob)
            .map_err(|e| RetrievalError::corrupt_index(index_name, e.to_string()))?;

        let text = std::str::from_utf8(&meta_blob).map_err(|e| {
            RetrievalError::corrupt_index(index_name, format!("metadata is not UTF-8: {}", e))
        })?;
        let metadata = decode_jsonl(text).map_err(|(line, e)| {
            RetrievalError::corrupt_index(index_name, format!("metadata line {}: {}", line, e))
        })?;

        debug!(
            index = %index_name,
            rows = vectors.rows(),
            records = metadata.len(),
            "Fetched index blobs"
        );
        Ok((vectors, metadata))
    }

    /// Upload an index, replacing any previous version
    pub async fn store(
        &self,
        index_name: &str,
        vectors: &VectorMatrix,
        metadata: &[IndexRecord],
    ) -> Result<()> {
        if vectors.rows() != metadata.len() {
            return Err(RetrievalError::row_count_mismatch(
                index_name,
                vectors.rows(),
                metadata.len(),
            ));
        }

        let vec_key = Self::vectors_key(index_name);
        info!(event = "s3_upload_start", file = %vec_key, "Uploading vectors");
        self.bounded("put", &vec_key, self.storage.put(&vec_key, encode_matrix(vectors)))
            .await?;
        info!(event = "s3_upload_end", file = %vec_key, "Uploaded vectors");

        let meta_key = Self::metadata_key(index_name);
        let meta = Bytes::from(encode_jsonl(metadata)?);
        info!(event = "s3_upload_start", file = %meta_key, "Uploading metadata");
        self.bounded("put", &meta_key, self.storage.put(&meta_key, meta))
            .await?;
        info!(event = "s3_upload_end", file = %meta_key, "Uploaded metadata");

        info!(
            event = "index_uploaded",
            index = %index_name,
            vectors = vectors.rows(),
            "Index uploaded"
        );
        Ok(())
    }

    /// Names of indexes that have a vector blob in storage
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        let objects = self.bounded("list", "", self.storage.list("")).await?;

        let names: BTreeSet<String> = objects
            .iter()
            .filter(|o| o.key.ends_with(VECTORS_OBJECT))
            .filter_map(|o| o.top_level().map(str::to_string))
            .collect();

        Ok(names.into_iter().collect())
    }
}
