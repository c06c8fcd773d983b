//! Resolving a source identifier to decoded pixels.

use image::DynamicImage;
use log::info;

use crate::error::{CropperError, Result};

/// A decoded source image. Immutable once loaded.
#[derive(Clone, Debug)]
pub struct SourceImage {
    image: DynamicImage,
}

impl SourceImage {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.image
    }
}

/// Turns a source identifier into a [`SourceImage`].
pub trait ImageLoader {
    fn load(&self, source: &str) -> Result<SourceImage>;
}

/// Loads images from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileLoader;

impl ImageLoader for FileLoader {
    fn load(&self, source: &str) -> Result<SourceImage> {
        let image = image::open(source).map_err(|err| CropperError::ImageLoad {
            source_id: source.to_owned(),
            source: err,
        })?;
        info!("loaded {} ({}x{})", source, image.width(), image.height());
        Ok(SourceImage::new(image))
    }
}
