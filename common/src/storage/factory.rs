//! Storage factory for creating segment stores from configuration.

use std::sync::Arc;

use object_store::ObjectStore;

use super::config::{ObjectStoreConfig, StorageConfig};
use super::in_memory::InMemorySegmentStore;
use super::object::ObjectSegmentStore;
use super::{SegmentStore, StorageError, StorageResult};

/// Creates a segment store based on the provided configuration.
///
/// # Examples
///
/// ```rust,ignore
/// use common::storage::config::StorageConfig;
/// use common::storage::factory::create_store;
///
/// let store = create_store(&StorageConfig::default()).await?;
/// ```
pub async fn create_store(config: &StorageConfig) -> StorageResult<Arc<dyn SegmentStore>> {
    match config {
        StorageConfig::InMemory(mem_config) => Ok(Arc::new(
            InMemorySegmentStore::with_max_appends(mem_config.max_appends_per_segment),
        )),
        StorageConfig::ObjectStore(os_config) => {
            let object_store = create_object_store(&os_config.object_store)?;
            Ok(Arc::new(ObjectSegmentStore::with_max_appends(
                object_store,
                os_config.max_appends_per_segment,
            )))
        }
    }
}

fn create_object_store(config: &ObjectStoreConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config {
        ObjectStoreConfig::InMemory => Arc::new(object_store::memory::InMemory::new()),
        ObjectStoreConfig::Aws(aws_config) => {
            let store = object_store::aws::AmazonS3Builder::from_env()
                .with_region(&aws_config.region)
                .with_bucket_name(&aws_config.bucket)
                .build()
                .map_err(|e| {
                    StorageError::Storage(format!("Failed to create AWS S3 store: {}", e))
                })?;
            Arc::new(store)
        }
        ObjectStoreConfig::Local(local_config) => {
            // Create the directory if it doesn't exist
            std::fs::create_dir_all(&local_config.path).map_err(|e| {
                StorageError::Storage(format!(
                    "Failed to create storage directory '{}': {}",
                    local_config.path, e
                ))
            })?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(&local_config.path)
                .map_err(|e| {
                    StorageError::Storage(format!(
                        "Failed to create local filesystem store: {}",
                        e
                    ))
                })?;
            Arc::new(store)
        }
    };
    Ok(store)
}
