//! S3-compatible object storage for the clipping pipeline.
//!
//! - [`ObjectStore`]: the multi-bucket operations the pipeline relies on
//! - [`S3Store`]: implementation over any S3 API endpoint (R2, MinIO, AWS)
//! - [`IngestResolver`]: finds uploaded source videos despite path drift

pub mod config;
pub mod error;
pub mod resolver;
pub mod s3;
pub mod store;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use resolver::{IngestResolver, ResolveHints};
pub use s3::S3Store;
pub use store::{ListPage, ObjectInfo, ObjectRef, ObjectStore, UploadOptions};
