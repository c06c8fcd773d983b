//! CPU compositing of the darkening layer.
//!
//! egui has no destination-out blend, so the overlay and every mask polygon
//! punched out of it are flattened into one RGBA buffer here and uploaded as
//! a texture by the painter.

use eframe::egui::{Color32, Pos2, Vec2};
use image::{Rgba, RgbaImage};

use crate::surface::{Blend, Primitive, Shape};

/// Flattens the source-over rectangles and destination-out polygons of
/// `primitives` into a buffer the size of `canvas`.
///
/// Lines and markers are ignored; they are painted as vectors on top.
pub fn rasterize_overlay<'a>(
    canvas: Vec2,
    primitives: impl IntoIterator<Item = &'a Primitive>,
) -> RgbaImage {
    let width = canvas.x.ceil().max(0.0) as u32;
    let height = canvas.y.ceil().max(0.0) as u32;
    let mut layer = RgbaImage::new(width, height);

    for primitive in primitives {
        let Some(fill) = primitive.style.fill else {
            continue;
        };
        match (&primitive.shape, primitive.blend) {
            (Shape::Rect(rect), Blend::SourceOver) => {
                let x0 = rect.min.x.max(0.0).round() as u32;
                let y0 = rect.min.y.max(0.0).round() as u32;
                let x1 = (rect.max.x.round().max(0.0) as u32).min(width);
                let y1 = (rect.max.y.round().max(0.0) as u32).min(height);
                for y in y0..y1 {
                    for x in x0..x1 {
                        layer.put_pixel(x, y, to_rgba(fill));
                    }
                }
            }
            (Shape::Polygon { points }, Blend::DestinationOut) => {
                let cover = fill.a() as f32 / 255.0;
                fill_polygon(&mut layer, points, |pixel| {
                    pixel.0[3] = (pixel.0[3] as f32 * (1.0 - cover)).round() as u8;
                });
            }
            _ => {}
        }
    }
    layer
}

fn to_rgba(color: Color32) -> Rgba<u8> {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Rgba([r, g, b, a])
}

/// Nonzero-winding scanline fill, sampling at pixel centres.
///
/// Self-intersecting outlines are filled wherever the winding count is not
/// zero, so the centre of a star is covered.
fn fill_polygon(layer: &mut RgbaImage, points: &[Pos2], mut paint: impl FnMut(&mut Rgba<u8>)) {
    if points.len() < 3 {
        return;
    }
    let (width, height) = layer.dimensions();
    let mut crossings: Vec<(f32, i32)> = Vec::with_capacity(points.len());

    for row in 0..height {
        let sample_y = row as f32 + 0.5;
        crossings.clear();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            let winding = match (a.y <= sample_y, b.y <= sample_y) {
                (true, false) => 1,
                (false, true) => -1,
                _ => continue,
            };
            let t = (sample_y - a.y) / (b.y - a.y);
            crossings.push((a.x + t * (b.x - a.x), winding));
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            if winding == 0 {
                continue;
            }
            let start = (pair[0].0 - 0.5).ceil().max(0.0) as u32;
            let end = ((pair[1].0 - 0.5).ceil().max(0.0) as u32).min(width);
            for column in start..end {
                paint(layer.get_pixel_mut(column, row));
            }
        }
    }
}
