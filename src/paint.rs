//! Draws a [`Scene`] with an egui painter.

use eframe::egui::{self, Color32, Painter, Pos2, Rect, TextureHandle, TextureOptions};

use crate::{
    composite::rasterize_overlay,
    surface::{MarkerShape, Scene, Shape, Surface},
};

/// GPU-side copies of the scene's raster layers.
#[derive(Default)]
pub struct SceneTextures {
    background: Option<TextureHandle>,
    overlay: Option<TextureHandle>,
    overlay_generation: Option<u64>,
}

impl SceneTextures {
    /// Forgets every uploaded layer; call after the scene was rebuilt.
    pub fn invalidate(&mut self) {
        self.background = None;
        self.overlay_generation = None;
    }

    fn sync(&mut self, ctx: &egui::Context, scene: &Scene) {
        if self.background.is_none()
            && let Some(background) = scene.background()
        {
            let image = background.image.pixels();
            let size = [image.width() as _, image.height() as _];
            let image_buffer = image.to_rgba8();
            let pixels = image_buffer.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.background =
                Some(ctx.load_texture("background", color_image, TextureOptions::LINEAR));
        }

        if self.overlay_generation != Some(scene.generation()) {
            let layer = rasterize_overlay(
                scene.dimensions(),
                scene.primitives().into_iter().map(|(_, p)| p),
            );
            let size = [layer.width() as _, layer.height() as _];
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, layer.as_raw());
            match &mut self.overlay {
                Some(texture) => texture.set(color_image, TextureOptions::NEAREST),
                None => {
                    self.overlay =
                        Some(ctx.load_texture("overlay", color_image, TextureOptions::NEAREST))
                }
            }
            self.overlay_generation = Some(scene.generation());
        }
    }
}

/// Paints `scene` with its top-left corner at `origin`.
pub fn paint_scene(painter: &Painter, origin: Pos2, scene: &Scene, textures: &mut SceneTextures) {
    textures.sync(painter.ctx(), scene);

    let canvas_rect = Rect::from_min_size(origin, scene.dimensions());
    let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    for texture in [&textures.background, &textures.overlay].into_iter().flatten() {
        painter.image(texture.id(), canvas_rect, uv, Color32::WHITE);
    }

    let to_screen = |pos: Pos2| origin + pos.to_vec2();
    for (_, primitive) in scene.primitives() {
        let fill = primitive.style.fill.unwrap_or(Color32::TRANSPARENT);
        match &primitive.shape {
            Shape::Line { start, end } => {
                let segment = [to_screen(*start), to_screen(*end)];
                match primitive.style.dash {
                    Some(dash) => painter.extend(egui::Shape::dashed_line(
                        &segment,
                        primitive.style.stroke,
                        dash.length,
                        dash.gap,
                    )),
                    None => {
                        painter.line_segment(segment, primitive.style.stroke);
                    }
                }
            }
            Shape::Marker {
                center,
                size,
                shape: MarkerShape::Rect,
                ..
            } => {
                let rect = Rect::from_center_size(to_screen(*center), egui::vec2(*size, *size));
                painter.rect(rect, 0.0, fill, primitive.style.stroke);
            }
            Shape::Marker {
                center,
                size,
                shape: MarkerShape::Circle,
                ..
            } => {
                painter.circle(to_screen(*center), size / 2.0, fill, primitive.style.stroke);
            }
            // Flattened into the overlay texture.
            Shape::Rect(_) | Shape::Polygon { .. } => {}
        }
    }
}
