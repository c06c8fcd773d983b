//! Retained 2D drawing surface the croppers build their primitives on.
//!
//! [`Surface`] is the seam to whatever actually puts pixels on screen.
//! [`Scene`] is the in-memory implementation: it keeps primitives in z-order
//! and is painted by [`crate::paint`].

use std::collections::BTreeMap;

use eframe::egui::{Color32, Pos2, Rect, Stroke, Vec2};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::image_source::SourceImage;

/// Stable handle to a primitive on a surface. Ids increase in insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(u64);

/// Typed name attached to a primitive so it can be found again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Overlay,
    Mask,
    Handle(usize),
    Edge { from: usize, to: usize },
}

/// How a primitive combines with what is already on the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Blend {
    #[default]
    SourceOver,
    /// Erases whatever lies beneath the primitive's fill.
    DestinationOut,
    /// Draws beneath existing content, visible only where content exists.
    DestinationAtop,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    #[default]
    Rect,
    Circle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Rect(Rect),
    /// A draggable marker centred on `center`. `padding` widens its hit area.
    Marker {
        center: Pos2,
        size: f32,
        padding: f32,
        shape: MarkerShape,
    },
    Line { start: Pos2, end: Pos2 },
    Polygon { points: Vec<Pos2> },
}

/// Repeating on/off pattern for stroked lines, in display pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dash {
    pub length: f32,
    pub gap: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Style {
    pub fill: Option<Color32>,
    pub stroke: Stroke,
    /// Solid when `None`.
    pub dash: Option<Dash>,
}

impl Style {
    pub fn filled(fill: Color32) -> Self {
        Self {
            fill: Some(fill),
            stroke: Stroke::NONE,
            dash: None,
        }
    }

    pub fn stroked(stroke: Stroke) -> Self {
        Self {
            fill: None,
            stroke,
            dash: None,
        }
    }

    pub fn with_stroke(mut self, stroke: Stroke) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn with_dash(mut self, dash: Option<Dash>) -> Self {
        self.dash = dash;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub tag: Option<Tag>,
    pub shape: Shape,
    pub style: Style,
    pub blend: Blend,
    /// Whether pointer events may target this primitive.
    pub interactive: bool,
}

impl Primitive {
    pub fn new(shape: Shape) -> Self {
        Self {
            tag: None,
            shape,
            style: Style::default(),
            blend: Blend::SourceOver,
            interactive: false,
        }
    }

    pub fn tagged(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn styled(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn blended(mut self, blend: Blend) -> Self {
        self.blend = blend;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Reference position of the primitive (top-left, centre or start point).
    pub fn position(&self) -> Pos2 {
        match &self.shape {
            Shape::Rect(rect) => rect.min,
            Shape::Marker { center, .. } => *center,
            Shape::Line { start, .. } => *start,
            Shape::Polygon { points } => points.first().copied().unwrap_or(Pos2::ZERO),
        }
    }
}

/// Creation options. The default turns rubber-band group selection off.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceOptions {
    pub selection: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundOptions {
    /// Per-axis factor mapping image pixels onto the surface.
    pub scale: Vec2,
    pub blend: Blend,
}

#[derive(Clone, Debug)]
pub struct Background {
    pub image: SourceImage,
    pub options: BackgroundOptions,
}

/// Operations a cropper needs from a drawing surface.
pub trait Surface {
    /// Prepares a fresh surface. Drops any existing content.
    fn configure(&mut self, options: SurfaceOptions);
    /// Removes every primitive and the background.
    fn clear(&mut self);
    fn set_dimensions(&mut self, size: Vec2);
    fn dimensions(&self) -> Vec2;
    fn set_background(&mut self, image: &SourceImage, options: BackgroundOptions);
    fn add(&mut self, primitive: Primitive) -> PrimitiveId;
    fn remove(&mut self, id: PrimitiveId) -> Option<Primitive>;
    fn get(&self, id: PrimitiveId) -> Option<&Primitive>;
    fn get_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive>;
    /// All primitives, bottom-most first.
    fn primitives(&self) -> Vec<(PrimitiveId, &Primitive)>;
    /// Requests that the surface be redrawn.
    fn repaint(&mut self);

    fn add_all(&mut self, primitives: Vec<Primitive>) -> Vec<PrimitiveId> {
        primitives.into_iter().map(|p| self.add(p)).collect()
    }

    /// First primitive carrying `tag`, bottom-most first.
    fn find_by_tag(&self, tag: Tag) -> Option<PrimitiveId> {
        self.primitives()
            .into_iter()
            .find(|(_, primitive)| primitive.tag == Some(tag))
            .map(|(id, _)| id)
    }
}

/// In-memory retained surface.
#[derive(Debug, Default)]
pub struct Scene {
    options: SurfaceOptions,
    size: Vec2,
    background: Option<Background>,
    primitives: BTreeMap<PrimitiveId, Primitive>,
    next_id: u64,
    generation: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> SurfaceOptions {
        self.options
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Bumped on every [`Surface::repaint`]; painters compare it to decide
    /// whether cached rasters are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn count_tagged(&self, predicate: impl Fn(Tag) -> bool) -> usize {
        self.primitives
            .values()
            .filter(|p| p.tag.is_some_and(&predicate))
            .count()
    }
}

impl Surface for Scene {
    fn configure(&mut self, options: SurfaceOptions) {
        debug!("configuring surface (selection={})", options.selection);
        self.options = options;
        self.clear();
    }

    fn clear(&mut self) {
        self.primitives.clear();
        self.background = None;
    }

    fn set_dimensions(&mut self, size: Vec2) {
        self.size = size;
    }

    fn dimensions(&self) -> Vec2 {
        self.size
    }

    fn set_background(&mut self, image: &SourceImage, options: BackgroundOptions) {
        self.background = Some(Background {
            image: image.clone(),
            options,
        });
    }

    fn add(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        self.primitives.insert(id, primitive);
        id
    }

    fn remove(&mut self, id: PrimitiveId) -> Option<Primitive> {
        self.primitives.remove(&id)
    }

    fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(&id)
    }

    fn get_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.primitives.get_mut(&id)
    }

    fn primitives(&self) -> Vec<(PrimitiveId, &Primitive)> {
        self.primitives.iter().map(|(id, p)| (*id, p)).collect()
    }

    fn repaint(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
