//! Storage configuration types.
//!
//! This module provides configuration structures for the segment store
//! backends, allowing services to pick a backend (InMemory or an object store)
//! via config files.

use serde::{Deserialize, Serialize};

use super::MAX_APPENDS_PER_SEGMENT;

/// Top-level storage configuration.
///
/// Defaults to an object store on the local `.data` directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StorageConfig {
    InMemory(InMemoryStorageConfig),
    ObjectStore(ObjectStoreStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::ObjectStore(ObjectStoreStorageConfig {
            object_store: ObjectStoreConfig::Local(LocalObjectStoreConfig {
                path: ".data".to_string(),
            }),
            max_appends_per_segment: default_max_appends_per_segment(),
        })
    }
}

fn default_max_appends_per_segment() -> u64 {
    MAX_APPENDS_PER_SEGMENT
}

/// In-memory segment store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InMemoryStorageConfig {
    /// Appends a segment accepts before refusing further writes.
    #[serde(default = "default_max_appends_per_segment")]
    pub max_appends_per_segment: u64,
}

impl Default for InMemoryStorageConfig {
    fn default() -> Self {
        Self {
            max_appends_per_segment: default_max_appends_per_segment(),
        }
    }
}

/// Object-store-backed segment store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectStoreStorageConfig {
    /// Object store provider configuration.
    pub object_store: ObjectStoreConfig,

    /// Appends a segment accepts before refusing further writes.
    #[serde(default = "default_max_appends_per_segment")]
    pub max_appends_per_segment: u64,
}

/// Object store provider configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    /// In-memory object store (useful for testing and development).
    #[default]
    InMemory,

    /// AWS S3 object store.
    Aws(AwsObjectStoreConfig),

    /// Local filesystem object store.
    Local(LocalObjectStoreConfig),
}

/// AWS S3 object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsObjectStoreConfig {
    /// AWS region (e.g., "us-west-2").
    pub region: String,

    /// S3 bucket name.
    pub bucket: String,
}

/// Local filesystem object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalObjectStoreConfig {
    /// Path to the local directory for storage.
    pub path: String,
}
