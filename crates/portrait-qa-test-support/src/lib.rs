//! Test support utilities for portrait-qa.
//!
//! Provides synthetic portraits, EXIF-tagged JPEGs, canned provider payloads
//! and in-memory port implementations for exercising the validation pipeline
//! without network access.
//!
//! # Example
//!
//! ```
//! use portrait_qa_core::domain::BoundingBox;
//! use portrait_qa_test_support::{AnnotationBuilder, FaceBuilder, PortraitBuilder};
//!
//! let portrait = PortraitBuilder::new(600, 600);
//! let response = AnnotationBuilder::new()
//!     .face(FaceBuilder::new(portrait.face_box()).age(25, 35, 0.8))
//!     .response();
//! let jpeg = portrait.jpeg();
//! assert!(!jpeg.is_empty());
//! # let _ = (response, BoundingBox::new(0, 0, 1, 1));
//! ```

mod builders;
mod exif;
mod features;
mod mocks;

pub use builders::{Background, PortraitBuilder, SyntheticImageBuilder};
pub use exif::ExifJpegBuilder;
pub use features::{AnnotationBuilder, DeepAnalysisBuilder, FaceBuilder};
pub use mocks::{
    MemoryObjectStorage, MockFeatureProvider, MockImageFetcher, MockImageSource,
    MockProgressSink, MockResultOutput,
};
