//! Core data structures passed between pipeline stages.
//!
//! Each stage exclusively owns its output type: [`PaperReference`] from the
//! reference parser, [`RawImageAsset`] from the extraction backend,
//! [`ClassifiedImage`] from the classifier and [`EnhancedImage`] from the
//! enhancement engine. Values cross stage boundaries by move, never by
//! shared mutation.

mod image;
mod paper;

pub use image::{ClassifiedImage, ClassifyReason, EnhancedImage, ImageKind, RawImageAsset};
pub use paper::{PaperReference, ReferenceError};
