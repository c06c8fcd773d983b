#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use eframe::egui;
use polygon_cropper::{CropperConfig, PolygonCropApp, cli::Args, init_logging};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);

    let config = match &args.config {
        Some(path) => CropperConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => CropperConfig::default(),
    };
    let points = args.points.iter().map(|&point| point.into()).collect();

    let mut app = PolygonCropApp::new(args.requested(), points, config);
    if let Some(image) = &args.image {
        app.open(image);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Polygon Cropper",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow!("failed to start the window: {err}"))
}
