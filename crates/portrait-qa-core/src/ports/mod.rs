//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod feature_provider;
mod image_fetcher;
mod image_source;
mod object_storage;
mod progress;
mod result_output;

pub use feature_provider::{FeatureProvider, ProviderRequest, ProviderResponse};
pub use image_fetcher::{FetchedImage, ImageFetcher};
pub use image_source::{ImageSource, SourceImage};
pub use object_storage::ObjectStorage;
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
