//! Validated, failure-aware publishing of course drafts.
//!
//! [`PublishPipeline::publish`] validates a draft, compresses its local images
//! through an [`AssetCompressor`], hands the result to a
//! [`coursekit_core::CourseRepository`] and clears the saved draft on success.

pub mod assets;
pub mod compress;
pub mod pipeline;

pub use assets::{is_pending_local, pending_assets, PendingAsset};
pub use compress::{AssetCompressor, AssetFile, CompressError, CompressionOptions, ImageCompressor};
pub use pipeline::{PublishPipeline, PublishStage, PERSISTENCE_FAILURE_MESSAGE};
