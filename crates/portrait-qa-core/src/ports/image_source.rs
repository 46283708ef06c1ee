//! Image source port for enumerating local inputs.

/// Raw bytes of one image and where they came from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Display path of the image.
    pub path: String,
    /// Encoded bytes, undecoded.
    pub bytes: Vec<u8>,
}

/// Port for loading images from a source.
pub trait ImageSource: Send + Sync {
    /// Returns an iterator over images from this source.
    ///
    /// # Errors
    ///
    /// Individual items may be errors if an image cannot be read.
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<SourceImage>> + Send + '_>;

    /// Returns the total number of images, if known.
    fn count_hint(&self) -> Option<usize>;
}
