//! Shared cropper plumbing: image, surface and scale.

use eframe::egui::{self, Rect, Vec2};
use log::debug;

use crate::{
    config::OverlayStyle,
    error::Result,
    geometry::{RequestedSize, Scale},
    image_source::{FileLoader, ImageLoader, SourceImage},
    surface::{
        BackgroundOptions, Blend, Primitive, PrimitiveId, Shape, Style, Surface, SurfaceOptions,
        Tag,
    },
};

/// Result of establishing a surface for one render pass.
///
/// Only [`Cropper::establish_surface`] hands these out, so anything that takes
/// a `Canvas` cannot run against a surface that was never set up.
///
/// ```compile_fail
/// use eframe::egui;
/// use polygon_cropper::{Canvas, Scale};
///
/// let canvas = Canvas {
///     size: egui::vec2(50.0, 50.0),
///     scale: Scale::default(),
/// };
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    size: Vec2,
    scale: Scale,
}

impl Canvas {
    pub(crate) fn new(size: Vec2, scale: Scale) -> Self {
        Self { size, scale }
    }

    /// Display size of the surface.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(egui::Pos2::ZERO, self.size)
    }
}

/// Something that can build a crop UI on a surface.
pub trait Cropper {
    /// Builds (or rebuilds from scratch) the full interactive UI.
    fn render(&mut self, surface: &mut dyn Surface) -> Result<()>;

    /// Loads the image and prepares an empty, correctly sized surface.
    fn establish_surface(&mut self, surface: &mut dyn Surface) -> Result<Canvas>;

    /// Ensures the single darkening overlay exists.
    fn draw_overlay(&mut self, surface: &mut dyn Surface, canvas: &Canvas) -> PrimitiveId;

    fn scale(&self) -> Scale;
}

/// Owns the source image and the per-render canvas state.
pub struct BaseCropper<L = FileLoader> {
    source: String,
    requested: RequestedSize,
    overlay_style: OverlayStyle,
    loader: L,
    image: Option<SourceImage>,
    canvas: Option<Canvas>,
    surface_configured: bool,
    overlay: Option<PrimitiveId>,
}

impl BaseCropper<FileLoader> {
    pub fn new(source: impl Into<String>, requested: RequestedSize) -> Self {
        Self::with_loader(source, requested, FileLoader)
    }
}

impl<L: ImageLoader> BaseCropper<L> {
    pub fn with_loader(source: impl Into<String>, requested: RequestedSize, loader: L) -> Self {
        Self {
            source: source.into(),
            requested,
            overlay_style: OverlayStyle::default(),
            loader,
            image: None,
            canvas: None,
            surface_configured: false,
            overlay: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Points the cropper at a different image. Takes effect on the next render.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    pub fn requested(&self) -> RequestedSize {
        self.requested
    }

    pub fn set_requested(&mut self, requested: RequestedSize) {
        self.requested = requested;
    }

    pub fn set_overlay_style(&mut self, style: OverlayStyle) {
        self.overlay_style = style;
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    /// Canvas of the last successful render pass.
    pub fn canvas(&self) -> Option<Canvas> {
        self.canvas
    }

    /// Looks a primitive up by its tag on `surface`.
    pub fn find_by_name(&self, surface: &dyn Surface, tag: Tag) -> Option<PrimitiveId> {
        surface.find_by_tag(tag)
    }
}

impl<L: ImageLoader> Cropper for BaseCropper<L> {
    fn render(&mut self, _surface: &mut dyn Surface) -> Result<()> {
        Ok(())
    }

    fn establish_surface(&mut self, surface: &mut dyn Surface) -> Result<Canvas> {
        // Nothing on the surface is touched until the image is in hand.
        let image = self.loader.load(&self.source)?;
        let scale = Scale::from_request(image.size(), self.requested);

        if self.surface_configured {
            surface.clear();
        } else {
            surface.configure(SurfaceOptions::default());
            self.surface_configured = true;
        }

        let size = scale.canvas_size(image.size());
        surface.set_dimensions(size);

        let (width, height) = image.size();
        let fill = if width > 0 && height > 0 {
            egui::vec2(size.x / width as f32, size.y / height as f32)
        } else {
            egui::vec2(1.0, 1.0)
        };
        surface.set_background(
            &image,
            BackgroundOptions {
                scale: fill,
                blend: Blend::DestinationAtop,
            },
        );
        debug!(
            "surface established at {}x{} (scale {})",
            size.x,
            size.y,
            scale.factor()
        );

        let canvas = Canvas::new(size, scale);
        self.image = Some(image);
        self.canvas = Some(canvas);
        self.overlay = None;
        Ok(canvas)
    }

    fn draw_overlay(&mut self, surface: &mut dyn Surface, canvas: &Canvas) -> PrimitiveId {
        if let Some(id) = self.overlay.filter(|id| surface.get(*id).is_some()) {
            return id;
        }
        let id = match self.find_by_name(surface, Tag::Overlay) {
            Some(id) => id,
            None => surface.add(
                Primitive::new(Shape::Rect(canvas.rect()))
                    .tagged(Tag::Overlay)
                    .styled(Style::filled(self.overlay_style.color.to_color32()))
                    .blended(Blend::SourceOver)
                    .interactive(false),
            ),
        };
        self.overlay = Some(id);
        id
    }

    fn scale(&self) -> Scale {
        self.canvas.map(|canvas| canvas.scale).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::CropperError, surface::Scene};
    use image::{DynamicImage, RgbaImage};

    struct Blank(u32, u32);

    impl ImageLoader for Blank {
        fn load(&self, source: &str) -> Result<SourceImage> {
            if source == "missing" {
                return Err(CropperError::ImageLoad {
                    source_id: source.to_owned(),
                    source: image::ImageError::IoError(std::io::ErrorKind::NotFound.into()),
                });
            }
            Ok(SourceImage::new(DynamicImage::ImageRgba8(RgbaImage::new(
                self.0, self.1,
            ))))
        }
    }

    fn cropper(width: f32) -> BaseCropper<Blank> {
        BaseCropper::with_loader("img", RequestedSize::new(width, 0.0), Blank(800, 600))
    }

    #[test]
    fn establishing_sizes_surface_by_scale() {
        let mut scene = Scene::new();
        let mut base = cropper(400.0);
        let canvas = base.establish_surface(&mut scene).unwrap();

        assert_eq!(canvas.size(), egui::vec2(400.0, 300.0));
        assert_eq!(scene.dimensions(), canvas.size());
        assert_eq!(base.scale().factor(), 0.5);

        let background = scene.background().unwrap();
        assert_eq!(background.options.blend, Blend::DestinationAtop);
        assert_eq!(background.options.scale, egui::vec2(0.5, 0.5));
    }

    #[test]
    fn scale_defaults_to_one_before_any_image() {
        assert_eq!(cropper(400.0).scale(), Scale::default());
    }

    #[test]
    fn canvas_only_comes_from_an_established_surface() {
        let mut scene = Scene::new();
        let mut base = cropper(400.0);
        assert_eq!(base.canvas(), None);

        base.set_source("missing");
        assert!(base.establish_surface(&mut scene).is_err());
        assert_eq!(base.canvas(), None);
        assert!(scene.is_empty());

        base.set_source("img");
        let canvas = base.establish_surface(&mut scene).unwrap();
        assert_eq!(base.canvas(), Some(canvas));
        assert_eq!(canvas.rect().size(), scene.dimensions());

        let id = base.draw_overlay(&mut scene, &canvas);
        assert_eq!(scene.get(id).unwrap().shape, Shape::Rect(canvas.rect()));
    }

    #[test]
    fn overlay_is_created_once() {
        let mut scene = Scene::new();
        let mut base = cropper(0.0);
        let canvas = base.establish_surface(&mut scene).unwrap();

        let first = base.draw_overlay(&mut scene, &canvas);
        let second = base.draw_overlay(&mut scene, &canvas);
        assert_eq!(first, second);
        assert_eq!(scene.count_tagged(|tag| tag == Tag::Overlay), 1);

        let overlay = scene.get(first).unwrap();
        assert!(!overlay.interactive);
        assert_eq!(overlay.shape, Shape::Rect(canvas.rect()));
    }

    #[test]
    fn overlay_found_by_name_when_slot_is_empty() {
        let mut scene = Scene::new();
        let mut base = cropper(0.0);
        let canvas = base.establish_surface(&mut scene).unwrap();
        let id = base.draw_overlay(&mut scene, &canvas);

        let mut other = cropper(0.0);
        assert_eq!(other.draw_overlay(&mut scene, &canvas), id);
        assert_eq!(base.find_by_name(&scene, Tag::Overlay), Some(id));
    }

    #[test]
    fn reestablishing_clears_previous_primitives() {
        let mut scene = Scene::new();
        let mut base = cropper(0.0);
        let canvas = base.establish_surface(&mut scene).unwrap();
        base.draw_overlay(&mut scene, &canvas);

        base.establish_surface(&mut scene).unwrap();
        assert!(scene.is_empty());
    }

    #[test]
    fn failed_load_leaves_surface_untouched() {
        let mut scene = Scene::new();
        let mut base = cropper(400.0);
        let canvas = base.establish_surface(&mut scene).unwrap();
        base.draw_overlay(&mut scene, &canvas);

        base.set_source("missing");
        let err = base.establish_surface(&mut scene).unwrap_err();
        assert!(matches!(err, CropperError::ImageLoad { .. }));
        assert_eq!(scene.len(), 1);
        assert_eq!(base.canvas(), Some(canvas));
    }
}
