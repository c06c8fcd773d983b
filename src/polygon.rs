//! Polygon masking: draggable vertices joined into a ring, with the ring's
//! interior punched out of the darkening overlay.
//!
//! Vertex positions are the single source of truth. Handles, edges and the
//! mask polygon are derived from them and brought back in line after every
//! drag event, so nothing on the surface is ever left stale.

use std::{collections::VecDeque, fs, path::Path};

use eframe::egui::{Color32, Pos2};
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::CropperConfig,
    cropper::{BaseCropper, Canvas, Cropper},
    error::{CropperError, Result},
    geometry::{Point, RequestedSize, Scale, canvas_corners, clamp_to_canvas, is_degenerate},
    image_source::{FileLoader, ImageLoader},
    surface::{Blend, MarkerShape, Primitive, PrimitiveId, Shape, Style, Surface, Tag},
};

/// One corner of the crop polygon, in display space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub index: usize,
    pub position: Pos2,
    pub handle: PrimitiveId,
}

/// Connector from vertex `from` to its successor `to`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub line: PrimitiveId,
}

/// A handle was dragged to `position` (display space, unclamped).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragEvent {
    pub index: usize,
    pub position: Pos2,
}

impl DragEvent {
    pub fn new(index: usize, position: Pos2) -> Self {
        Self { index, position }
    }
}

/// The current crop polygon in both coordinate spaces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropPolygon {
    /// Display-space points, in vertex order.
    pub canvas: Vec<Point>,
    /// The same points mapped back onto source-image pixels.
    pub image: Vec<Point>,
}

impl CropPolygon {
    /// Writes the polygon as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let export = |source: std::io::Error| CropperError::Export {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_vec_pretty(self).map_err(|err| export(err.into()))?;
        fs::write(path, json).map_err(export)
    }
}

/// Interactive polygon masker over a single image.
pub struct PolygonCropper<L = FileLoader> {
    base: BaseCropper<L>,
    /// Caller-supplied seed points in source-image pixels.
    user_points: Vec<Pos2>,
    config: CropperConfig,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    mask: Option<PrimitiveId>,
    pending: VecDeque<DragEvent>,
    rendered: Option<Canvas>,
}

impl PolygonCropper<FileLoader> {
    pub fn new(source: impl Into<String>, requested: RequestedSize, points: Vec<Pos2>) -> Self {
        Self::with_loader(source, requested, points, FileLoader)
    }
}

impl<L: ImageLoader> PolygonCropper<L> {
    pub fn with_loader(
        source: impl Into<String>,
        requested: RequestedSize,
        points: Vec<Pos2>,
        loader: L,
    ) -> Self {
        Self {
            base: BaseCropper::with_loader(source, requested, loader),
            user_points: points,
            config: CropperConfig::default(),
            vertices: Vec::new(),
            edges: Vec::new(),
            mask: None,
            pending: VecDeque::new(),
            rendered: None,
        }
    }

    pub fn with_config(mut self, config: CropperConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn set_config(&mut self, config: CropperConfig) {
        self.base.set_overlay_style(config.overlay);
        self.config = config;
    }

    pub fn config(&self) -> &CropperConfig {
        &self.config
    }

    pub fn base(&self) -> &BaseCropper<L> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BaseCropper<L> {
        &mut self.base
    }

    /// Replaces the seed points used by the next render. An empty list means
    /// "start from the canvas corners".
    pub fn set_points(&mut self, points: Vec<Pos2>) {
        self.user_points = points;
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn mask(&self) -> Option<PrimitiveId> {
        self.mask
    }

    /// Canvas of the current render pass, if one completed.
    pub fn canvas(&self) -> Option<Canvas> {
        self.rendered
    }

    /// Current vertex positions in index order.
    pub fn positions(&self) -> Vec<Pos2> {
        self.vertices.iter().map(|vertex| vertex.position).collect()
    }

    /// Current polygon in display and source space.
    pub fn polygon(&self) -> Result<CropPolygon> {
        let canvas = self.rendered.ok_or(CropperError::SurfaceNotEstablished)?;
        Ok(CropPolygon {
            canvas: self.vertices.iter().map(|v| v.position.into()).collect(),
            image: self
                .vertices
                .iter()
                .map(|v| canvas.scale().to_source(v.position).into())
                .collect(),
        })
    }

    /// Index of the handle under `pointer`, preferring the closest one.
    pub fn hit_test(&self, pointer: Pos2) -> Option<usize> {
        let handle = &self.config.handle;
        let reach = handle.size / 2.0 + handle.padding;
        self.vertices
            .iter()
            .filter(|vertex| {
                let delta = pointer - vertex.position;
                match handle.shape {
                    MarkerShape::Rect => delta.x.abs() <= reach && delta.y.abs() <= reach,
                    MarkerShape::Circle => delta.length() <= reach,
                }
            })
            .min_by(|a, b| {
                let da = pointer.distance_sq(a.position);
                let db = pointer.distance_sq(b.position);
                da.total_cmp(&db)
            })
            .map(|vertex| vertex.index)
    }

    /// Initial vertex positions for this render pass.
    fn seed_points(&self, canvas: &Canvas) -> Vec<Pos2> {
        if self.user_points.is_empty() {
            canvas_corners(canvas.size())
        } else {
            self.user_points
                .iter()
                .map(|point| canvas.scale().to_display(*point))
                .collect()
        }
    }

    fn handle_primitive(&self, index: usize, center: Pos2) -> Primitive {
        let handle = &self.config.handle;
        Primitive::new(Shape::Marker {
            center,
            size: handle.size,
            padding: handle.padding,
            shape: handle.shape,
        })
        .tagged(Tag::Handle(index))
        .styled(Style::filled(handle.color.to_color32()).with_stroke(handle.border()))
        .interactive(true)
    }

    fn edge_primitive(&self, from: usize, to: usize, start: Pos2, end: Pos2) -> Primitive {
        Primitive::new(Shape::Line { start, end })
            .tagged(Tag::Edge { from, to })
            .styled(
                Style::stroked(self.config.line.stroke())
                    .with_dash(self.config.line.dash_pattern()),
            )
            .interactive(false)
    }

    /// Brings the overlay and the mask polygon in line with `points`.
    ///
    /// The mask is created on first use and updated in place afterwards.
    fn draw_mask(&mut self, surface: &mut dyn Surface, canvas: &Canvas, points: &[Pos2]) {
        self.base.draw_overlay(surface, canvas);

        let existing = self
            .mask
            .filter(|id| surface.get(*id).is_some())
            .or_else(|| surface.find_by_tag(Tag::Mask));

        let id = match existing {
            Some(id) => {
                if let Some(Primitive {
                    shape: Shape::Polygon { points: current },
                    ..
                }) = surface.get_mut(id)
                {
                    current.clear();
                    current.extend_from_slice(points);
                }
                id
            }
            None => surface.add(
                Primitive::new(Shape::Polygon {
                    points: points.to_vec(),
                })
                .tagged(Tag::Mask)
                .styled(Style::filled(Color32::BLACK))
                .blended(Blend::DestinationOut)
                .interactive(false),
            ),
        };
        self.mask = Some(id);
    }

    /// Applies one drag event: clamp, move the handle, follow with both
    /// adjacent edges, then refresh the mask and repaint.
    ///
    /// Returns the clamped position the vertex ended up at.
    pub fn handle_drag(&mut self, surface: &mut dyn Surface, event: DragEvent) -> Result<Pos2> {
        let canvas = self.rendered.ok_or(CropperError::SurfaceNotEstablished)?;
        let count = self.vertices.len();
        let vertex = self
            .vertices
            .get_mut(event.index)
            .ok_or(CropperError::UnknownVertex {
                index: event.index,
                count,
            })?;

        let position = clamp_to_canvas(event.position, canvas.size());
        vertex.position = position;
        if let Some(Primitive {
            shape: Shape::Marker { center, .. },
            ..
        }) = surface.get_mut(vertex.handle)
        {
            *center = position;
        }

        if let Some(outgoing) = self.edges.iter().find(|edge| edge.from == event.index)
            && let Some(Primitive {
                shape: Shape::Line { start, .. },
                ..
            }) = surface.get_mut(outgoing.line)
        {
            *start = position;
        }
        if let Some(incoming) = self.edges.iter().find(|edge| edge.to == event.index)
            && let Some(Primitive {
                shape: Shape::Line { end, .. },
                ..
            }) = surface.get_mut(incoming.line)
        {
            *end = position;
        }

        let points = self.positions();
        self.draw_mask(surface, &canvas, &points);
        surface.repaint();

        trace!(
            "vertex {} dragged to ({}, {}), clamped to ({}, {})",
            event.index, event.position.x, event.position.y, position.x, position.y
        );
        Ok(position)
    }

    /// Queues a drag event for [`Self::process_drags`].
    pub fn queue_drag(&mut self, event: DragEvent) {
        self.pending.push_back(event);
    }

    pub fn pending_drags(&self) -> usize {
        self.pending.len()
    }

    /// Applies queued drag events in arrival order, each to completion.
    ///
    /// Returns the resulting polygon when at least one event was applied.
    /// On error the failing event is dropped and later events stay queued.
    pub fn process_drags(&mut self, surface: &mut dyn Surface) -> Result<Option<CropPolygon>> {
        let mut moved = false;
        while let Some(event) = self.pending.pop_front() {
            self.handle_drag(surface, event)?;
            moved = true;
        }
        if moved { self.polygon().map(Some) } else { Ok(None) }
    }
}

impl<L: ImageLoader> Cropper for PolygonCropper<L> {
    fn render(&mut self, surface: &mut dyn Surface) -> Result<()> {
        let canvas = self.base.establish_surface(surface)?;

        self.vertices.clear();
        self.edges.clear();
        self.mask = None;
        self.pending.clear();
        self.rendered = None;

        let points = self.seed_points(&canvas);
        if is_degenerate(&points) {
            warn!(
                "accepting degenerate polygon with {} points; the mask may not enclose an area",
                points.len()
            );
        }

        let count = points.len();
        let handles: Vec<Primitive> = points
            .iter()
            .enumerate()
            .map(|(index, point)| self.handle_primitive(index, *point))
            .collect();
        let lines: Vec<Primitive> = (0..count)
            .map(|from| {
                let to = (from + 1) % count;
                self.edge_primitive(from, to, points[from], points[to])
            })
            .collect();

        self.draw_mask(surface, &canvas, &points);

        let handle_ids = surface.add_all(handles);
        self.vertices = handle_ids
            .into_iter()
            .zip(&points)
            .enumerate()
            .map(|(index, (handle, position))| Vertex {
                index,
                position: *position,
                handle,
            })
            .collect();

        let line_ids = surface.add_all(lines);
        self.edges = line_ids
            .into_iter()
            .enumerate()
            .map(|(from, line)| Edge {
                from,
                to: (from + 1) % count,
                line,
            })
            .collect();

        self.rendered = Some(canvas);
        surface.repaint();
        info!(
            "rendered polygon cropper: {} vertices on {}x{} canvas",
            count, canvas.size().x, canvas.size().y
        );
        Ok(())
    }

    fn establish_surface(&mut self, surface: &mut dyn Surface) -> Result<Canvas> {
        self.base.establish_surface(surface)
    }

    fn draw_overlay(&mut self, surface: &mut dyn Surface, canvas: &Canvas) -> PrimitiveId {
        self.base.draw_overlay(surface, canvas)
    }

    fn scale(&self) -> Scale {
        self.base.scale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{image_source::SourceImage, surface::Scene};
    use eframe::egui;
    use image::{DynamicImage, RgbaImage};

    struct Blank(u32, u32);

    impl ImageLoader for Blank {
        fn load(&self, _source: &str) -> Result<SourceImage> {
            Ok(SourceImage::new(DynamicImage::ImageRgba8(RgbaImage::new(
                self.0, self.1,
            ))))
        }
    }

    fn rendered(points: Vec<Pos2>) -> (PolygonCropper<Blank>, Scene) {
        let mut scene = Scene::new();
        let mut cropper = PolygonCropper::with_loader(
            "blank",
            RequestedSize::new(400.0, 0.0),
            points,
            Blank(800, 600),
        );
        cropper.render(&mut scene).unwrap();
        (cropper, scene)
    }

    fn line_of(scene: &Scene, edge: &Edge) -> (Pos2, Pos2) {
        match &scene.get(edge.line).unwrap().shape {
            Shape::Line { start, end } => (*start, *end),
            other => panic!("edge is not a line: {other:?}"),
        }
    }

    fn mask_points(scene: &Scene, cropper: &PolygonCropper<Blank>) -> Vec<Pos2> {
        match &scene.get(cropper.mask().unwrap()).unwrap().shape {
            Shape::Polygon { points } => points.clone(),
            other => panic!("mask is not a polygon: {other:?}"),
        }
    }

    #[test]
    fn seeds_canvas_corners_without_user_points() {
        let (cropper, _) = rendered(Vec::new());
        assert_eq!(
            cropper.positions(),
            vec![
                egui::pos2(0.0, 0.0),
                egui::pos2(399.0, 0.0),
                egui::pos2(399.0, 299.0),
                egui::pos2(0.0, 299.0),
            ]
        );
    }

    #[test]
    fn scales_user_points_in_order() {
        let (cropper, _) = rendered(vec![
            egui::pos2(100.0, 40.0),
            egui::pos2(700.0, 80.0),
            egui::pos2(420.0, 560.0),
        ]);
        assert_eq!(
            cropper.positions(),
            vec![
                egui::pos2(50.0, 20.0),
                egui::pos2(350.0, 40.0),
                egui::pos2(210.0, 280.0),
            ]
        );
    }

    #[test]
    fn edges_close_the_ring() {
        let (cropper, scene) = rendered(Vec::new());
        let edges = cropper.edges();
        assert_eq!(edges.len(), 4);
        for (i, edge) in edges.iter().enumerate() {
            assert_eq!(edge.from, i);
            assert_eq!(edge.to, (i + 1) % 4);
            let (start, end) = line_of(&scene, edge);
            assert_eq!(start, cropper.vertices()[edge.from].position);
            assert_eq!(end, cropper.vertices()[edge.to].position);
        }
    }

    #[test]
    fn primitives_stack_overlay_mask_handles_edges() {
        let (_, scene) = rendered(Vec::new());
        let tags: Vec<_> = scene
            .primitives()
            .into_iter()
            .map(|(_, p)| p.tag.unwrap())
            .collect();
        assert_eq!(tags[0], Tag::Overlay);
        assert_eq!(tags[1], Tag::Mask);
        assert_eq!(&tags[2..6], &[
            Tag::Handle(0),
            Tag::Handle(1),
            Tag::Handle(2),
            Tag::Handle(3)
        ]);
        assert_eq!(tags[6], Tag::Edge { from: 0, to: 1 });
        assert_eq!(tags[9], Tag::Edge { from: 3, to: 0 });
    }

    #[test]
    fn edges_carry_the_configured_dash() {
        let mut config = CropperConfig::default();
        config.line.dash = vec![6.0, 3.0];
        let mut scene = Scene::new();
        let mut cropper = PolygonCropper::with_loader(
            "blank",
            RequestedSize::new(400.0, 0.0),
            Vec::new(),
            Blank(800, 600),
        )
        .with_config(config);
        cropper.render(&mut scene).unwrap();

        for edge in cropper.edges() {
            let style = scene.get(edge.line).unwrap().style;
            assert_eq!(
                style.dash,
                Some(crate::surface::Dash {
                    length: 6.0,
                    gap: 3.0
                })
            );
        }
        let handle = scene.get(cropper.vertices()[0].handle).unwrap();
        assert_eq!(handle.style.dash, None);
    }

    #[test]
    fn mask_punches_out_the_overlay() {
        let (cropper, scene) = rendered(Vec::new());
        let mask = scene.get(cropper.mask().unwrap()).unwrap();
        assert_eq!(mask.blend, Blend::DestinationOut);
        assert!(!mask.interactive);
        assert!(scene.get(cropper.vertices()[0].handle).unwrap().interactive);
    }

    #[test]
    fn drag_moves_handle_edges_and_mask() {
        let (mut cropper, mut scene) = rendered(Vec::new());
        let moved = cropper
            .handle_drag(&mut scene, DragEvent::new(2, egui::pos2(250.0, 180.0)))
            .unwrap();
        assert_eq!(moved, egui::pos2(250.0, 180.0));

        let handle = scene.get(cropper.vertices()[2].handle).unwrap();
        assert_eq!(handle.position(), moved);

        let (start, _) = line_of(&scene, &cropper.edges()[2]);
        let (_, end) = line_of(&scene, &cropper.edges()[1]);
        assert_eq!(start, moved);
        assert_eq!(end, moved);

        assert_eq!(mask_points(&scene, &cropper), cropper.positions());
    }

    #[test]
    fn drag_clamps_to_canvas() {
        let (mut cropper, mut scene) = rendered(Vec::new());
        let low = cropper
            .handle_drag(&mut scene, DragEvent::new(0, egui::pos2(-20.0, -1.0)))
            .unwrap();
        assert_eq!(low, egui::pos2(0.0, 0.0));

        let high = cropper
            .handle_drag(&mut scene, DragEvent::new(2, egui::pos2(400.0, 301.0)))
            .unwrap();
        assert_eq!(high, egui::pos2(399.0, 299.0));

        let edge = cropper
            .handle_drag(&mut scene, DragEvent::new(3, egui::pos2(10.0, 300.0)))
            .unwrap();
        assert_eq!(edge, egui::pos2(10.0, 300.0));
    }

    #[test]
    fn mask_is_updated_in_place() {
        let (mut cropper, mut scene) = rendered(Vec::new());
        let mask = cropper.mask();
        let before = scene.len();
        for step in 0..20 {
            cropper
                .handle_drag(&mut scene, DragEvent::new(1, egui::pos2(300.0, step as f32)))
                .unwrap();
        }
        assert_eq!(cropper.mask(), mask);
        assert_eq!(scene.len(), before);
        assert_eq!(scene.count_tagged(|tag| tag == Tag::Mask), 1);
    }

    #[test]
    fn every_drag_repaints() {
        let (mut cropper, mut scene) = rendered(Vec::new());
        let before = scene.generation();
        cropper
            .handle_drag(&mut scene, DragEvent::new(0, egui::pos2(5.0, 5.0)))
            .unwrap();
        cropper
            .handle_drag(&mut scene, DragEvent::new(0, egui::pos2(6.0, 5.0)))
            .unwrap();
        assert_eq!(scene.generation(), before + 2);
    }

    #[test]
    fn drag_before_render_is_rejected() {
        let mut scene = Scene::new();
        let mut cropper = PolygonCropper::with_loader(
            "blank",
            RequestedSize::default(),
            Vec::new(),
            Blank(10, 10),
        );
        let err = cropper
            .handle_drag(&mut scene, DragEvent::new(0, Pos2::ZERO))
            .unwrap_err();
        assert!(matches!(err, CropperError::SurfaceNotEstablished));
        assert!(matches!(
            cropper.polygon(),
            Err(CropperError::SurfaceNotEstablished)
        ));
    }

    #[test]
    fn drag_of_unknown_vertex_is_rejected() {
        let (mut cropper, mut scene) = rendered(Vec::new());
        let err = cropper
            .handle_drag(&mut scene, DragEvent::new(7, Pos2::ZERO))
            .unwrap_err();
        assert!(matches!(
            err,
            CropperError::UnknownVertex { index: 7, count: 4 }
        ));
    }

    #[test]
    fn degenerate_input_is_accepted() {
        let (cropper, scene) = rendered(vec![egui::pos2(10.0, 10.0), egui::pos2(10.0, 10.0)]);
        assert_eq!(cropper.vertices().len(), 2);
        assert_eq!(cropper.edges().len(), 2);
        assert_eq!(mask_points(&scene, &cropper).len(), 2);
    }

    #[test]
    fn queued_drags_apply_in_order() {
        let (mut cropper, mut scene) = rendered(Vec::new());
        assert_eq!(cropper.process_drags(&mut scene).unwrap(), None);

        cropper.queue_drag(DragEvent::new(1, egui::pos2(200.0, 10.0)));
        cropper.queue_drag(DragEvent::new(1, egui::pos2(210.0, 20.0)));
        cropper.queue_drag(DragEvent::new(3, egui::pos2(-5.0, 150.0)));
        assert_eq!(cropper.pending_drags(), 3);

        let polygon = cropper.process_drags(&mut scene).unwrap().unwrap();
        assert_eq!(cropper.pending_drags(), 0);
        assert_eq!(polygon.canvas[1], Point { x: 210.0, y: 20.0 });
        assert_eq!(polygon.canvas[3], Point { x: 0.0, y: 150.0 });
        assert_eq!(polygon.image[1], Point { x: 420.0, y: 40.0 });
    }

    #[test]
    fn failing_drag_keeps_later_events_queued() {
        let (mut cropper, mut scene) = rendered(Vec::new());
        cropper.queue_drag(DragEvent::new(9, Pos2::ZERO));
        cropper.queue_drag(DragEvent::new(0, egui::pos2(4.0, 4.0)));
        assert!(cropper.process_drags(&mut scene).is_err());
        assert_eq!(cropper.pending_drags(), 1);
    }

    #[test]
    fn polygon_exports_as_json() {
        let (cropper, _) = rendered(Vec::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polygon.json");
        cropper.polygon().unwrap().save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: CropPolygon = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.canvas[2], Point { x: 399.0, y: 299.0 });
        assert_eq!(parsed.image[2], Point { x: 798.0, y: 598.0 });
    }

    #[test]
    fn hit_test_prefers_the_nearest_handle() {
        let (cropper, _) = rendered(vec![
            egui::pos2(100.0, 100.0),
            egui::pos2(130.0, 100.0),
            egui::pos2(100.0, 300.0),
        ]);
        // Handles at (50, 50), (65, 50) and (50, 150).
        assert_eq!(cropper.hit_test(egui::pos2(52.0, 51.0)), Some(0));
        assert_eq!(cropper.hit_test(egui::pos2(62.0, 50.0)), Some(1));
        assert_eq!(cropper.hit_test(egui::pos2(200.0, 200.0)), None);
    }
}
