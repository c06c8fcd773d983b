//! Visual settings for handles, edges and the darkening overlay.
//!
//! Every field has a default, so a JSON file only needs to name what it
//! overrides:
//!
//! ```json
//! { "handle": { "shape": "circle", "size": 9 }, "overlay": { "color": { "alpha": 120 } } }
//! ```

use std::{fs, path::Path};

use eframe::egui::{Color32, Stroke};
use serde::{Deserialize, Serialize};

use crate::{
    error::{CropperError, Result},
    surface::{Dash, MarkerShape},
};

/// RGBA color stored in 8-bit channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RgbaColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RgbaColor {
    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn to_color32(self) -> Color32 {
        Color32::from_rgba_unmultiplied(self.red, self.green, self.blue, self.alpha)
    }
}

impl Default for RgbaColor {
    fn default() -> Self {
        Self::opaque(0, 0, 0)
    }
}

const ACCENT: RgbaColor = RgbaColor::opaque(0x78, 0xa6, 0xf1);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HandleStyle {
    pub shape: MarkerShape,
    /// Side length of a square handle, diameter of a round one.
    pub size: f32,
    /// Extra grab distance around the handle, in display pixels.
    pub padding: f32,
    pub color: RgbaColor,
    pub border_color: RgbaColor,
    pub border_width: f32,
}

impl Default for HandleStyle {
    fn default() -> Self {
        Self {
            shape: MarkerShape::Rect,
            size: 7.0,
            padding: 10.0,
            color: ACCENT,
            border_color: ACCENT,
            border_width: 0.0,
        }
    }
}

impl HandleStyle {
    pub fn border(&self) -> Stroke {
        Stroke::new(self.border_width, self.border_color.to_color32())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LineStyle {
    pub color: RgbaColor,
    pub width: f32,
    /// Alternating dash and gap lengths; empty draws solid lines.
    pub dash: Vec<f32>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: ACCENT,
            width: 1.0,
            dash: Vec::new(),
        }
    }
}

impl LineStyle {
    pub fn stroke(&self) -> Stroke {
        Stroke::new(self.width, self.color.to_color32())
    }

    /// Dash pattern to paint edges with.
    ///
    /// A single length is used for both the dash and the gap. Entries past
    /// the first pair are ignored, and a pattern with a non-positive length
    /// falls back to a solid line.
    pub fn dash_pattern(&self) -> Option<Dash> {
        let (length, gap) = match self.dash.as_slice() {
            [] => return None,
            [length] => (*length, *length),
            [length, gap, ..] => (*length, *gap),
        };
        (length > 0.0 && gap > 0.0).then_some(Dash { length, gap })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayStyle {
    pub color: RgbaColor,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        // rgba(0, 0, 0, 0.7)
        Self {
            color: RgbaColor::new(0, 0, 0, 178),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CropperConfig {
    pub handle: HandleStyle,
    pub line: LineStyle,
    pub overlay: OverlayStyle,
}

impl CropperConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CropperError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CropperError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
