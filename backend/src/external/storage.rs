//! S3 object storage for product media
//!
//! Objects are content-addressed: `products/{product_id}/{sha256}.{ext}`.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use sha2::{Digest, Sha256};
use shared::types::{MediaReference, MediaType};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

/// Client for the media bucket
#[derive(Clone)]
pub struct MediaStorage {
    client: S3Client,
    config: StorageConfig,
}

/// Object key for a product media file
pub fn media_key(product_id: Uuid, data: &[u8], extension: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let hash = hex::encode(hasher.finalize());
    format!("products/{}/{}.{}", product_id, hash, extension)
}

/// Lowercased file extension, if any
pub fn file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl MediaStorage {
    /// Build a client from the ambient AWS configuration and the storage section
    pub async fn connect(config: StorageConfig) -> AppResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(AppError::Configuration("storage.bucket is empty".to_string()));
        }

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        Ok(Self::from_client(S3Client::new(&aws_config), config))
    }

    pub fn from_client(client: S3Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    /// Upload a file and return where it can be fetched from
    pub async fn put(
        &self,
        product_id: Uuid,
        kind: MediaType,
        filename: &str,
        data: Vec<u8>,
    ) -> AppResult<MediaReference> {
        let extension = file_extension(filename).unwrap_or_default();
        let key = media_key(product_id, &data, &extension);
        let size_bytes = data.len() as u64;

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(kind.content_type_for(&extension))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "S3 upload failed");
                AppError::Storage("Media upload failed".to_string())
            })?;

        tracing::info!(product_id = %product_id, key = %key, size_bytes, "Product media uploaded");

        Ok(MediaReference {
            url: self.config.public_url(&key),
            key,
            file_type: kind,
            original_filename: Some(filename.to_string()),
            size_bytes,
        })
    }

    /// Delete the object behind a public URL. URLs outside the bucket are ignored.
    pub async fn delete_by_url(&self, url: &str) -> AppResult<()> {
        let Some(key) = self.config.key_from_url(url) else {
            tracing::warn!(url = %url, "Media URL is not in the configured bucket, skipping delete");
            return Ok(());
        };

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "S3 delete failed");
                AppError::Storage("Media delete failed".to_string())
            })?;

        tracing::info!(key = %key, "Product media deleted");
        Ok(())
    }
}
