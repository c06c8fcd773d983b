//! Command line surface of the desktop binary.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::geometry::{Point, RequestedSize};

#[derive(Debug, Parser)]
#[command(author, version, about = "Drag a polygon over an image to choose what to keep")]
pub struct Args {
    /// Image to open on startup.
    pub image: Option<PathBuf>,

    /// Display width in pixels (0 = unconstrained). Takes precedence over --height.
    #[arg(long, default_value_t = 0.0)]
    pub width: f32,

    /// Display height in pixels (0 = unconstrained).
    #[arg(long, default_value_t = 0.0)]
    pub height: f32,

    /// Initial vertex in source-image pixels. Repeat for each vertex, in order.
    #[arg(long = "point", value_name = "X,Y", value_parser = parse_point)]
    pub points: Vec<Point>,

    /// JSON file with handle, line and overlay styling.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn requested(&self) -> RequestedSize {
        RequestedSize::new(self.width, self.height)
    }
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{raw}'"))?;
    let coord = |value: &str| {
        value
            .trim()
            .parse::<f32>()
            .map_err(|err| format!("invalid coordinate '{value}': {err}"))
    };
    Ok(Point {
        x: coord(x)?,
        y: coord(y)?,
    })
}
