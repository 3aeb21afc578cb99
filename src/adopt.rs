//! Fitting a chart quadrilateral into the bounds of a loaded image

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{bounds, fits_inside, Point, Quad};

/// Inset of the fallback rectangle from every image edge, in pixels
pub const FALLBACK_MARGIN: f64 = 10.0;

/// Requested orientation change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Auto,
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rotation::Auto => "auto",
            Rotation::Clockwise => "cw",
            Rotation::CounterClockwise => "ccw",
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Rotation::Auto),
            "cw" | "clockwise" => Ok(Rotation::Clockwise),
            "ccw" | "counterclockwise" | "counter-clockwise" => Ok(Rotation::CounterClockwise),
            other => Err(format!("unknown rotation '{}'", other)),
        }
    }
}

/// What `fit` did to the corners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    Unchanged,
    /// Rotated by this many quarter turns
    Rotated(u8),
    /// Replaced by the fixed-margin rectangle
    Fallback,
}

/// Rotate points 90° clockwise about the image frame
fn rotate_cw(corners: &mut [Point], _width: f64, height: f64) {
    for p in corners.iter_mut() {
        *p = Point::new(height - p.y, p.x);
    }
}

/// Rotate points 90° counter-clockwise about the image frame
fn rotate_ccw(corners: &mut [Point], width: f64, _height: f64) {
    for p in corners.iter_mut() {
        *p = Point::new(p.y, width - p.x);
    }
}

fn is_portrait(corners: &[Point]) -> bool {
    let (min, max) = bounds(corners);
    (max.y - min.y) > (max.x - min.x)
}

/// Rectangle inset by `margin` from every edge, in quad order
pub fn fallback_rect(width: f64, height: f64, margin: f64) -> Quad {
    [
        Point::new(margin, margin),
        Point::new(width - margin, margin),
        Point::new(margin, height - margin),
        Point::new(width - margin, height - margin),
    ]
}

/// Fit `corners` into `[0, width] x [0, height]`, mutating them in place.
///
/// A forced rotation only applies to corners that already fit; it turns once
/// and a second time if the first turn left the frame, accepting the result
/// either way. Out-of-bounds corners go through the automatic path: match the
/// image orientation with one counter-clockwise turn, then fall back to the
/// margin rectangle if they still do not fit.
pub fn fit(corners: &mut Quad, width: u32, height: u32, hint: Rotation, margin: f64) -> Adoption {
    let (w, h) = (width as f64, height as f64);

    let hint = if fits_inside(corners, w, h) {
        if hint == Rotation::Auto {
            return Adoption::Unchanged;
        }
        hint
    } else {
        Rotation::Auto
    };

    let turn: fn(&mut [Point], f64, f64) = match hint {
        Rotation::Clockwise => rotate_cw,
        Rotation::CounterClockwise => rotate_ccw,
        Rotation::Auto => {
            let mut turns = 0;
            if is_portrait(corners) != (h > w) {
                rotate_ccw(corners, w, h);
                turns = 1;
            }
            if fits_inside(corners, w, h) {
                debug!("Chart fits after {} quarter turn(s)", turns);
                return Adoption::Rotated(turns);
            }
            debug!("Chart does not fit {}x{}, using {} px margin rectangle", width, height, margin);
            *corners = fallback_rect(w, h, margin);
            return Adoption::Fallback;
        }
    };

    turn(corners, w, h);
    if fits_inside(corners, w, h) {
        return Adoption::Rotated(1);
    }
    turn(corners, w, h);
    Adoption::Rotated(2)
}
