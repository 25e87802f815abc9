//! Firestore persistence for videos and clips.
//!
//! - [`FirestoreClient`]: REST client with token caching, retries and transactions
//! - [`VideoStore`]: the operations the pipeline performs on the store
//! - [`FirestoreStore`]: `VideoStore` over Firestore
//! - `MemoryStore` (feature `memory`): in-process `VideoStore`

pub mod client;
pub mod codec;
pub mod error;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use store::{FirestoreStore, VideoStore};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
