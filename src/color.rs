//! Colour conversions used for previews and quality feedback
//!
//! This module handles:
//! - CIE XYZ (0..100 scale) to 8-bit sRGB for chart preview colours
//! - Normalised RGB to 8-bit triples and `#RRGGBB` strings for reports
//! - The palette used to colour-code patch quality tiers

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// CIE XYZ tristimulus values on the 0..100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from a loosely shaped vector, rejecting anything but 3 values
    pub fn from_slice(what: &str, values: &[f64]) -> Result<Self> {
        match values {
            [x, y, z] => Ok(Self::new(*x, *y, *z)),
            _ => Err(Error::dimension(what, 3, values.len())),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// 8-bit sRGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_packed(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Quantise normalised (0..1) components, clamping out-of-range values
    pub fn from_normalized(rgb: [f64; 3]) -> Self {
        let q = |c: f64| (c.clamp(0.0, 1.0) * 255.0) as u8;
        Self::new(q(rgb[0]), q(rgb[1]), q(rgb[2]))
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// sRGB transfer curve
#[inline]
fn srgb_encode(c: f64) -> f64 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert XYZ (D65, 0..100) to a display sRGB preview colour
pub fn xyz_to_srgb(xyz: &Xyz) -> Rgb8 {
    let (x, y, z) = (xyz.x / 100.0, xyz.y / 100.0, xyz.z / 100.0);

    let r = 3.2406 * x - 1.5372 * y - 0.4986 * z;
    let g = -0.9689 * x + 1.8758 * y + 0.0415 * z;
    let b = 0.0557 * x - 0.2040 * y + 1.0570 * z;

    let q = |c: f64| (srgb_encode(c).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb8::new(q(r), q(g), q(b))
}

/// Overlay colours for quality tiers 0 (best) to 4 (worst)
pub const TIER_COLOURS: [u32; 5] = [
    0x22C55E, // green, excellent
    0x84CC16, // lime, good
    0xEAB308, // yellow, fair
    0xF97326, // orange, poor
    0xEF4444, // red, very poor
];
pub const NON_RELIABLE_COLOUR: u32 = 0xFF0000;
pub const OUT_OF_SCALE_COLOUR: u32 = 0x000000;
