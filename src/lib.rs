//! Interactive polygon crop masking over an image.
//!
//! A [`PolygonCropper`] loads an image onto a [`Surface`], darkens it with a
//! full-canvas overlay and punches the polygon formed by its draggable
//! vertices out of that overlay. The live vertex positions are the crop
//! polygon; [`PolygonCropper::polygon`] reports them in both display and
//! source-image pixels.

/// Desktop front end built on eframe.
pub mod app;
/// Command line arguments.
pub mod cli;
/// CPU flattening of the overlay layer.
pub mod composite;
/// Styling configuration.
pub mod config;
/// Image, surface and scale shared by every cropper.
pub mod cropper;
pub mod error;
/// Source/display coordinate mapping and drag bounds.
pub mod geometry;
/// Image loading.
pub mod image_source;
/// Painting a scene with egui.
pub mod paint;
/// The polygon masking engine.
pub mod polygon;
/// Drawing surface abstraction and the in-memory scene.
pub mod surface;

use log::LevelFilter;

pub use app::PolygonCropApp;
pub use config::CropperConfig;
pub use cropper::{BaseCropper, Canvas, Cropper};
pub use error::{CropperError, Result};
pub use geometry::{Point, RequestedSize, Scale};
pub use image_source::{FileLoader, ImageLoader, SourceImage};
pub use polygon::{CropPolygon, DragEvent, Edge, PolygonCropper, Vertex};
pub use surface::{Primitive, PrimitiveId, Scene, Surface, Tag};

/// Initialize logging once.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies.
pub fn init_logging(default_filter: LevelFilter) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
}
