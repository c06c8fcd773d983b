use std::path::Path;

use eframe::egui;
use log::{error, info, warn};

use crate::{
    config::CropperConfig,
    cropper::Cropper,
    geometry::RequestedSize,
    image_source::ImageLoader,
    paint::{SceneTextures, paint_scene},
    polygon::{CropPolygon, DragEvent, PolygonCropper},
    surface::Scene,
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Handle currently held by the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ActiveDrag {
    index: usize,
    /// Handle centre minus pointer position at grab time.
    grab_offset: egui::Vec2,
}

pub struct PolygonCropApp {
    scene: Scene,
    cropper: Option<PolygonCropper>,
    textures: SceneTextures,
    active_drag: Option<ActiveDrag>,
    polygon: Option<CropPolygon>,
    status: Option<String>,
    requested: RequestedSize,
    points: Vec<egui::Pos2>,
    config: CropperConfig,
}

impl PolygonCropApp {
    pub fn new(requested: RequestedSize, points: Vec<egui::Pos2>, config: CropperConfig) -> Self {
        Self {
            scene: Scene::new(),
            cropper: None,
            textures: SceneTextures::default(),
            active_drag: None,
            polygon: None,
            status: None,
            requested,
            points,
            config,
        }
    }

    /// Opens `path` and rebuilds the polygon UI for it.
    ///
    /// A failed load leaves whatever was on screen untouched. The first
    /// cropper is only kept once it has rendered successfully.
    pub fn open(&mut self, path: &Path) {
        let source = path.to_string_lossy().into_owned();
        let rendered = match self.cropper.as_mut() {
            Some(cropper) => {
                let previous = cropper.base().source().to_owned();
                cropper.base_mut().set_source(source);
                let rendered = cropper.render(&mut self.scene);
                if rendered.is_err() {
                    cropper.base_mut().set_source(previous);
                }
                rendered
            }
            None => {
                let mut cropper =
                    PolygonCropper::new(source, self.requested, self.points.clone())
                        .with_config(self.config.clone());
                let rendered = cropper.render(&mut self.scene);
                if rendered.is_ok() {
                    self.cropper = Some(cropper);
                }
                rendered
            }
        };

        match rendered {
            Ok(()) => {
                self.textures.invalidate();
                self.active_drag = None;
                self.polygon = self
                    .cropper
                    .as_ref()
                    .and_then(|cropper| cropper.polygon().ok());
                self.status = None;
            }
            Err(err) => {
                error!("{err}");
                self.status = Some(err.to_string());
            }
        }
    }

    fn rerender(&mut self) {
        let Some(cropper) = self.cropper.as_mut() else {
            return;
        };
        match cropper.render(&mut self.scene) {
            Ok(()) => {
                self.textures.invalidate();
                self.active_drag = None;
                self.polygon = cropper.polygon().ok();
            }
            Err(err) => {
                error!("{err}");
                self.status = Some(err.to_string());
            }
        }
    }

    fn export_polygon(&mut self) {
        let Some(polygon) = &self.polygon else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name("polygon.json")
            .save_file()
        {
            match polygon.save(&path) {
                Ok(()) => info!("exported polygon to {}", path.display()),
                Err(err) => {
                    error!("{err}");
                    self.status = Some(err.to_string());
                }
            }
        }
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let Some(cropper) = self.cropper.as_mut() else {
            ui.centered_and_justified(|ui| {
                ui.label("Open or drop an image to start");
            });
            return;
        };
        let Some(canvas) = cropper.canvas() else {
            return;
        };

        let (response, painter) = ui.allocate_painter(canvas.size(), egui::Sense::drag());
        let origin = response.rect.min;
        let to_canvas = |pos: egui::Pos2| egui::pos2(pos.x - origin.x, pos.y - origin.y);

        // The drag only starts once the pointer has moved past egui's
        // threshold, so grab where the button went down.
        if response.drag_started()
            && let Some(press) = ui
                .ctx()
                .input(|i| i.pointer.press_origin())
                .or(response.interact_pointer_pos())
        {
            self.active_drag = begin_drag(cropper, to_canvas(press));
        }

        if response.dragged()
            && let Some(active) = self.active_drag
            && let Some(pos) = response.interact_pointer_pos()
        {
            cropper.queue_drag(DragEvent::new(
                active.index,
                to_canvas(pos) + active.grab_offset,
            ));
        }

        match cropper.process_drags(&mut self.scene) {
            Ok(Some(polygon)) => self.polygon = Some(polygon),
            Ok(None) => {}
            Err(err) => warn!("dropped drag event: {err}"),
        }

        if response.drag_stopped() {
            self.active_drag = None;
        }

        paint_scene(&painter, origin, &self.scene, &mut self.textures);
    }

    fn polygon_ui(&self, ui: &mut egui::Ui) {
        ui.heading("Polygon");
        let Some(polygon) = &self.polygon else {
            ui.label("No image loaded");
            return;
        };
        egui::Grid::new("polygon_points")
            .striped(true)
            .num_columns(3)
            .show(ui, |ui| {
                ui.strong("#");
                ui.strong("Canvas");
                ui.strong("Image");
                ui.end_row();
                for (index, (canvas, image)) in
                    polygon.canvas.iter().zip(&polygon.image).enumerate()
                {
                    ui.label(index.to_string());
                    ui.label(format!("{:.1}, {:.1}", canvas.x, canvas.y));
                    ui.label(format!("{:.1}, {:.1}", image.x, image.y));
                    ui.end_row();
                }
            });
    }
}

/// Grabs the handle under `press`, remembering where on it the pointer sits.
fn begin_drag<L: ImageLoader>(
    cropper: &PolygonCropper<L>,
    press: egui::Pos2,
) -> Option<ActiveDrag> {
    cropper.hit_test(press).map(|index| ActiveDrag {
        index,
        grab_offset: cropper.vertices()[index].position - press,
    })
}

impl eframe::App for PolygonCropApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle dropped files
        let dropped = ctx.input(|i| {
            i.raw
                .dropped_files
                .first()
                .and_then(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            self.open(&path);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open Image").clicked()
                    && let Some(path) = rfd::FileDialog::new()
                        .add_filter("Image", IMAGE_EXTENSIONS)
                        .pick_file()
                {
                    self.open(&path);
                }
                if ui
                    .add_enabled(self.cropper.is_some(), egui::Button::new("Reset"))
                    .clicked()
                {
                    self.rerender();
                }
                if ui
                    .add_enabled(self.polygon.is_some(), egui::Button::new("Export Polygon"))
                    .clicked()
                {
                    self.export_polygon();
                }
                if let Some(status) = &self.status {
                    ui.colored_label(ui.visuals().error_fg_color, status);
                }
            });
        });

        egui::SidePanel::right("polygon_panel")
            .resizable(true)
            .show(ctx, |ui| self.polygon_ui(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| self.canvas_ui(ui));
        });
    }
}
