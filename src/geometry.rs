//! Mapping between source-image pixels and display-canvas pixels.
//!
//! Display space is what the user drags in; source space is what a consumer
//! of the finished polygon usually wants. The two differ by a single uniform
//! [`Scale`].

use eframe::egui::{self, Pos2, Vec2};
use serde::{Deserialize, Serialize};

/// Display size asked for by the host. Zero means "unconstrained".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestedSize {
    pub width: f32,
    pub height: f32,
}

impl RequestedSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Uniform multiplier from source space to display space. Always positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale(f32);

impl Default for Scale {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Scale {
    /// Derives the scale for an image of `native` pixels.
    ///
    /// A requested width wins over a requested height; with neither set the
    /// image is shown at its native size.
    pub fn from_request(native: (u32, u32), requested: RequestedSize) -> Self {
        let (native_w, native_h) = (native.0 as f32, native.1 as f32);
        let factor = if requested.width > 0.0 && native_w > 0.0 {
            requested.width / native_w
        } else if requested.height > 0.0 && native_h > 0.0 {
            requested.height / native_h
        } else {
            1.0
        };
        if factor.is_finite() && factor > 0.0 {
            Self(factor)
        } else {
            Self(1.0)
        }
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    pub fn to_display(self, source: Pos2) -> Pos2 {
        egui::pos2(source.x * self.0, source.y * self.0)
    }

    pub fn to_source(self, display: Pos2) -> Pos2 {
        egui::pos2(display.x / self.0, display.y / self.0)
    }

    /// Size of the display canvas for an image of `native` pixels.
    pub fn canvas_size(self, native: (u32, u32)) -> Vec2 {
        egui::vec2(native.0 as f32 * self.0, native.1 as f32 * self.0)
    }
}

/// Plain serializable point, used when polygons leave the crate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<Pos2> for Point {
    fn from(pos: Pos2) -> Self {
        Self { x: pos.x, y: pos.y }
    }
}

impl From<Point> for Pos2 {
    fn from(point: Point) -> Self {
        egui::pos2(point.x, point.y)
    }
}

/// The four canvas corners in winding order, starting top-left.
pub fn canvas_corners(canvas: Vec2) -> Vec<Pos2> {
    vec![
        egui::pos2(0.0, 0.0),
        egui::pos2(canvas.x - 1.0, 0.0),
        egui::pos2(canvas.x - 1.0, canvas.y - 1.0),
        egui::pos2(0.0, canvas.y - 1.0),
    ]
}

/// Keeps a dragged vertex on the canvas.
///
/// `x` is bounded to `[0, floor(width) - 1]`. `y` is only pulled back once it
/// passes `height`, so `y == height` is left alone.
pub fn clamp_to_canvas(pos: Pos2, canvas: Vec2) -> Pos2 {
    let max_x = canvas.x.floor() - 1.0;
    let x = if pos.x < 0.0 {
        0.0
    } else if pos.x > max_x {
        max_x
    } else {
        pos.x
    };

    let y = if pos.y < 0.0 {
        0.0
    } else if pos.y > canvas.y {
        canvas.y - 1.0
    } else {
        pos.y
    };

    egui::pos2(x, y)
}

/// True when the points cannot enclose an area: fewer than three of them, or
/// two coincident vertices.
pub fn is_degenerate(points: &[Pos2]) -> bool {
    if points.len() < 3 {
        return true;
    }
    points
        .iter()
        .enumerate()
        .any(|(i, a)| points[i + 1..].iter().any(|b| a == b))
}
