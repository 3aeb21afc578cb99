//! Reference chart definitions
//!
//! A [`ChartDefinition`] is built once from parsed chart data and shared
//! read-only by every [`crate::grid::WorkingGrid`] derived from it. All shape
//! checks happen here; downstream code trusts the normalized coordinates.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::{xyz_to_srgb, Rgb8, Xyz};
use crate::error::{Error, Result};
use crate::geometry::{bounds, CornerId, Point, Quad, Size};

/// One colour patch of the reference chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchDef {
    pub name: String,
    /// Center in the unit square
    pub center: Point,
    /// Extent in the unit square
    pub extent: Size,
    /// Expected colour, XYZ on the 0..100 scale
    pub xyz: Xyz,
    /// Display colour derived from `xyz`
    pub preview: Rgb8,
}

/// Loosely shaped patch record as produced by chart parsers
#[derive(Debug, Clone, Deserialize)]
pub struct RawPatch {
    pub name: String,
    pub center: Vec<f64>,
    pub extent: Vec<f64>,
    pub xyz: Vec<f64>,
}

/// Loosely shaped chart record as produced by chart parsers
#[derive(Debug, Clone, Deserialize)]
pub struct RawChart {
    pub patches: Vec<RawPatch>,
    pub corner_ref: Vec<Vec<f64>>,
}

/// Immutable reference chart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawChart")]
pub struct ChartDefinition {
    patches: Vec<PatchDef>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    corner_ref: Quad,
    range_names: [String; 4],
}

fn pair(what: String, values: &[f64]) -> Result<[f64; 2]> {
    match values {
        [a, b] => Ok([*a, *b]),
        _ => Err(Error::dimension(what, 2, values.len())),
    }
}

fn check_unit(patch: &str, field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::PatchOutOfRange {
            patch: patch.to_string(),
            field,
            value,
        })
    }
}

impl PatchDef {
    pub fn new(name: impl Into<String>, center: Point, extent: Size, xyz: Xyz) -> Result<Self> {
        let name = name.into();
        check_unit(&name, "center.u", center.x)?;
        check_unit(&name, "center.v", center.y)?;
        check_unit(&name, "extent.w", extent.w)?;
        check_unit(&name, "extent.h", extent.h)?;
        if !xyz.is_finite() {
            return Err(Error::PatchOutOfRange {
                patch: name,
                field: "xyz",
                value: f64::NAN,
            });
        }
        Ok(Self {
            preview: xyz_to_srgb(&xyz),
            name,
            center,
            extent,
            xyz,
        })
    }
}

impl TryFrom<RawPatch> for PatchDef {
    type Error = Error;

    fn try_from(raw: RawPatch) -> Result<Self> {
        let center = pair(format!("center of patch {}", raw.name), &raw.center)?;
        let extent = pair(format!("extent of patch {}", raw.name), &raw.extent)?;
        let xyz = Xyz::from_slice(&format!("XYZ of patch {}", raw.name), &raw.xyz)?;
        PatchDef::new(
            raw.name,
            Point::from(center),
            Size::new(extent[0], extent[1]),
            xyz,
        )
    }
}

impl TryFrom<RawChart> for ChartDefinition {
    type Error = Error;

    fn try_from(raw: RawChart) -> Result<Self> {
        if raw.corner_ref.len() != 4 {
            return Err(Error::dimension("reference corners", 4, raw.corner_ref.len()));
        }
        let mut corner_ref = [Point::default(); 4];
        for (slot, values) in corner_ref.iter_mut().zip(&raw.corner_ref) {
            *slot = Point::from(pair("reference corner".to_string(), values)?);
        }

        let patches = raw
            .patches
            .into_iter()
            .map(PatchDef::try_from)
            .collect::<Result<Vec<_>>>()?;

        ChartDefinition::new(patches, corner_ref)
    }
}

impl ChartDefinition {
    pub fn new(patches: Vec<PatchDef>, corner_ref: Quad) -> Result<Self> {
        if patches.is_empty() {
            return Err(Error::EmptyChart);
        }
        if let Some(p) = corner_ref.iter().find(|p| !p.is_finite()) {
            return Err(Error::degenerate(format!("non-finite reference corner {:?}", p)));
        }

        let mut index = HashMap::with_capacity(patches.len());
        for (i, patch) in patches.iter().enumerate() {
            if index.insert(patch.name.clone(), i).is_some() {
                return Err(Error::DuplicatePatch(patch.name.clone()));
            }
        }

        let range_names = find_corner_patches(&patches);

        Ok(Self {
            patches,
            index,
            corner_ref,
            range_names,
        })
    }

    /// Parse and validate a JSON chart definition
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawChart = serde_json::from_str(json)?;
        ChartDefinition::try_from(raw)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn patches(&self) -> &[PatchDef] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patch(&self, name: &str) -> Result<&PatchDef> {
        self.index
            .get(name)
            .map(|&i| &self.patches[i])
            .ok_or_else(|| Error::UnknownPatch(name.to_string()))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn corner_ref(&self) -> &Quad {
        &self.corner_ref
    }

    /// Patches nearest the top-left, top-right, bottom-left and bottom-right extremes
    pub fn range_names(&self) -> &[String; 4] {
        &self.range_names
    }

    pub fn range_name(&self, corner: CornerId) -> &str {
        &self.range_names[corner.index()]
    }

    pub fn centers(&self) -> Vec<Point> {
        self.patches.iter().map(|p| p.center).collect()
    }

    pub fn extents(&self) -> Vec<Size> {
        self.patches.iter().map(|p| p.extent).collect()
    }
}

fn find_corner_patches(patches: &[PatchDef]) -> [String; 4] {
    let centers: Vec<Point> = patches.iter().map(|p| p.center).collect();
    let (min, max) = bounds(&centers);
    let extremes = [
        Point::new(min.x, min.y),
        Point::new(max.x, min.y),
        Point::new(min.x, max.y),
        Point::new(max.x, max.y),
    ];

    extremes.map(|corner| {
        patches
            .iter()
            .min_by(|a, b| {
                a.center
                    .distance(&corner)
                    .total_cmp(&b.center.distance(&corner))
            })
            .map(|p| p.name.clone())
            .unwrap_or_default()
    })
}
