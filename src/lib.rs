//! Background-loading cache of previously captured images for a camera
//! remote control application.
//!
//! Captured files are registered with [`PreviousImagesManager::add_new_image`]
//! and decoded one at a time on a dedicated worker thread; navigation
//! requests are answered from cache or asynchronously once the decode
//! finishes.
//!
//! # Cache growth
//!
//! The cache never evicts: every decoded image stays resident for the
//! manager's lifetime. [`CacheConfig::max_cached_bytes`] is a soft budget
//! only; crossing it emits a single `warn!` event, and the current footprint
//! is available via [`PreviousImagesManager::cached_bytes`].

pub mod config;
pub mod decode;
pub mod error;
pub mod executor;
pub mod manager;
pub mod record;
pub mod store;

pub use config::CacheConfig;
pub use error::{Error, Result};
pub use manager::PreviousImagesManager;
pub use record::{ImagePayload, ImageRecord, LoadState, Metadata, MetadataField, RecordHandle};
pub use store::RequestKind;
