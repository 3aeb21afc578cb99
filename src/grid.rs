//! Working grid: chart corners placed on one image and the derived patch layout

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adopt::{self, fallback_rect, Adoption, Rotation, FALLBACK_MARGIN};
use crate::chart::ChartDefinition;
use crate::error::{Error, Result};
use crate::geometry::{CornerId, Point, Quad, Size};
use crate::image_source::PatchBox;
use crate::transform::{project_patches, ProjectedGrid, QuadLimits};

/// Editor and placement settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Sampling box size as a percentage of the projected patch size
    pub default_scale: u32,
    /// Pick radius for corner handles, in pixels
    pub corner_hit_radius: f64,
    pub fallback_margin: f64,
    pub limits: QuadLimits,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_scale: 100,
            corner_hit_radius: 25.0,
            fallback_margin: FALLBACK_MARGIN,
            limits: QuadLimits::default(),
        }
    }
}

/// Chart placement on one image.
///
/// `corner` is the only editable state. Patch centers and sizes are derived
/// from it and replaced only after a successful projection, so they always
/// match the current corners.
#[derive(Debug, Clone)]
pub struct WorkingGrid {
    chart: Arc<ChartDefinition>,
    centers: Vec<Point>,
    extents: Vec<Size>,
    image_width: u32,
    image_height: u32,
    corner: Quad,
    projected: ProjectedGrid,
    scale: u32,
    config: GridConfig,
}

impl WorkingGrid {
    /// Place `chart` on a `width x height` image.
    ///
    /// The reference corners are scaled to fit the image, adopted with
    /// automatic rotation and projected.
    pub fn attach(chart: Arc<ChartDefinition>, width: u32, height: u32, config: &GridConfig) -> Result<Self> {
        let mut grid = Self {
            centers: chart.centers(),
            extents: chart.extents(),
            chart,
            image_width: width,
            image_height: height,
            corner: [Point::default(); 4],
            projected: ProjectedGrid::default(),
            scale: config.default_scale.clamp(1, 100),
            config: config.clone(),
        };
        grid.reset()?;
        info!(
            "Attached {}-patch chart to {}x{} image",
            grid.len(),
            width,
            height
        );
        Ok(grid)
    }

    /// Reference corners scaled uniformly into the image frame
    fn initial_corners(&self) -> Quad {
        let reference = self.chart.corner_ref();
        let origin = reference[0];
        let chart_w = reference[3].x - origin.x;
        let chart_h = reference[3].y - origin.y;

        let s = (self.image_width as f64 / chart_w).min(self.image_height as f64 / chart_h);
        let s = if s.is_finite() && s > 0.0 { s } else { 1.0 };

        reference.map(|p| Point::new((p.x - origin.x) * s, (p.y - origin.y) * s))
    }

    /// Restore the initial placement
    pub fn reset(&mut self) -> Result<()> {
        let mut corners = self.initial_corners();
        let (w, h) = (self.image_width, self.image_height);
        adopt::fit(&mut corners, w, h, Rotation::Auto, self.config.fallback_margin);

        if let Err(e) = self.set_corners(corners) {
            debug!("Initial placement rejected ({}), using margin rectangle", e);
            let rect = fallback_rect(w as f64, h as f64, self.config.fallback_margin);
            self.set_corners(rect)?;
        }
        Ok(())
    }

    /// Project the current corners. On failure the previous layout is kept.
    fn recompute(&mut self) -> Result<()> {
        match project_patches(&self.centers, &self.extents, &self.corner, &self.config.limits) {
            Ok(projected) => {
                self.projected = projected;
                Ok(())
            }
            Err(e) => {
                debug!("Keeping previous layout: {}", e);
                Err(e)
            }
        }
    }

    /// Replace all four corners, reverting if they do not project
    pub fn set_corners(&mut self, corners: Quad) -> Result<()> {
        let previous = self.corner;
        self.corner = corners;
        if let Err(e) = self.recompute() {
            self.corner = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Move one corner handle, reverting if the quad degenerates
    pub fn move_corner(&mut self, id: CornerId, to: Point) -> Result<()> {
        let mut corners = self.corner;
        corners[id.index()] = to;
        self.set_corners(corners)
    }

    /// Fit the current corners into the image
    pub fn adopt(&mut self, rotation: Rotation) -> Result<Adoption> {
        let mut corners = self.corner;
        let outcome = adopt::fit(
            &mut corners,
            self.image_width,
            self.image_height,
            rotation,
            self.config.fallback_margin,
        );
        self.set_corners(corners)?;
        Ok(outcome)
    }

    /// Shift which handle plays which corner by a quarter turn
    pub fn rotate_assignment(&mut self, direction: Rotation) -> Result<()> {
        let c = self.corner;
        let relabelled = match direction {
            Rotation::Clockwise => [c[1], c[2], c[3], c[0]],
            Rotation::CounterClockwise => [c[3], c[0], c[1], c[2]],
            Rotation::Auto => return Ok(()),
        };
        self.set_corners(relabelled)
    }

    /// Closest corner handle within `radius` pixels of `p`
    pub fn nearest_corner(&self, p: Point, radius: f64) -> Option<CornerId> {
        CornerId::ALL
            .into_iter()
            .map(|id| (id, self.corner[id.index()].distance(&p)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Hit test with the configured pick radius
    pub fn corner_at(&self, p: Point) -> Option<CornerId> {
        self.nearest_corner(p, self.config.corner_hit_radius)
    }

    /// Drag the handle under `from` to `to`; `None` if no handle was hit
    pub fn drag_corner(&mut self, from: Point, to: Point) -> Result<Option<CornerId>> {
        let Some(id) = self.corner_at(from) else {
            return Ok(None);
        };
        self.move_corner(id, to)?;
        debug!("Dragged {} corner to ({:.1}, {:.1})", id.as_str(), to.x, to.y);
        Ok(Some(id))
    }

    pub fn set_scale(&mut self, percent: u32) {
        self.scale = percent.clamp(1, 100);
    }

    /// Pixel boxes to sample, in patch order
    pub fn sampling_boxes(&self) -> Vec<PatchBox> {
        self.projected
            .points
            .iter()
            .zip(&self.projected.patch_wh)
            .map(|(&c, &wh)| {
                PatchBox::around(c, wh, self.scale, self.image_width, self.image_height)
            })
            .collect()
    }

    /// Projected centers of the four range patches, for labelling
    pub fn range_points(&self) -> Result<Vec<(&str, Point)>> {
        self.chart
            .range_names()
            .iter()
            .map(|name| {
                let i = self
                    .chart
                    .index_of(name)
                    .ok_or_else(|| Error::UnknownPatch(name.clone()))?;
                Ok((name.as_str(), self.projected.points[i]))
            })
            .collect()
    }

    pub fn chart(&self) -> &Arc<ChartDefinition> {
        &self.chart
    }

    pub fn corners(&self) -> &Quad {
        &self.corner
    }

    pub fn points(&self) -> &[Point] {
        &self.projected.points
    }

    pub fn patch_wh(&self) -> &[Size] {
        &self.projected.patch_wh
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}
