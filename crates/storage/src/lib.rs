//! Object storage for uploaded and generated images.
//!
//! [`S3Storage`] talks to any S3-compatible endpoint (AWS, Supabase
//! Storage, MinIO). [`MemoryStorage`] keeps objects in process for the
//! single-process deployment and tests.

mod config;
mod memory;
mod s3;

pub use config::StorageConfig;
pub use memory::{MemoryStorage, StoredObject};
pub use s3::S3Storage;
