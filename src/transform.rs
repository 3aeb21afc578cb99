//! Perspective transformation from normalized chart space to image pixels
//!
//! This module implements the perspective (homography) transformation that
//! maps the canonical unit square onto the four chart corners picked in a
//! photographed or scanned image, and uses it to place every patch center
//! and patch extent in pixel space.

use nalgebra::{Matrix3, Matrix3xX, SMatrix, SVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::{Point, Quad, Size, UNIT_SQUARE};

/// Limits below which a corner quadrilateral is rejected
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct QuadLimits {
    /// Minimum distance between any two corners, in pixels
    pub min_corner_distance: f64,
    /// Minimum |cross(TR - TL, BR - TL)|, in square pixels
    pub min_area: f64,
}

impl Default for QuadLimits {
    fn default() -> Self {
        Self {
            min_corner_distance: 5.0,
            min_area: 1024.0,
        }
    }
}

/// Check that a destination quadrilateral can carry a stable homography
pub fn validate_quad(quad: &Quad, limits: &QuadLimits) -> Result<()> {
    if let Some(p) = quad.iter().find(|p| !p.is_finite()) {
        return Err(Error::degenerate(format!("non-finite corner {:?}", p)));
    }

    for i in 0..4 {
        for j in (i + 1)..4 {
            let d = quad[i].distance(&quad[j]);
            if d < limits.min_corner_distance {
                return Err(Error::degenerate(format!(
                    "corners {} and {} are {:.2} px apart",
                    i, j, d
                )));
            }
        }
    }

    let ab = (quad[1].x - quad[0].x, quad[1].y - quad[0].y);
    let ad = (quad[3].x - quad[0].x, quad[3].y - quad[0].y);
    let area = (ab.0 * ad.1 - ab.1 * ad.0).abs();
    if area <= limits.min_area {
        return Err(Error::degenerate(format!(
            "area {:.1} px² is below {:.1} px²",
            area, limits.min_area
        )));
    }

    Ok(())
}

/// Perspective transformation matrix (3x3 homography)
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveTransform {
    matrix: Matrix3<f64>,
}

impl PerspectiveTransform {
    /// Transform taking the unit square onto `quad`, after validating it
    pub fn from_unit_square(quad: &Quad, limits: &QuadLimits) -> Result<Self> {
        validate_quad(quad, limits)?;
        Self::compute(&UNIT_SQUARE, quad)
    }

    /// Compute the perspective transform from 4 source points to 4 destination points
    /// Uses the Direct Linear Transform (DLT) algorithm
    pub fn compute(src: &Quad, dst: &Quad) -> Result<Self> {
        let matrix = compute_homography(src, dst)
            .ok_or_else(|| Error::degenerate("singular homography system"))?;
        Ok(Self { matrix })
    }

    /// Transform a single point
    #[inline]
    pub fn transform_point(&self, p: Point) -> Point {
        let h = &self.matrix;
        let w = h[(2, 0)] * p.x + h[(2, 1)] * p.y + h[(2, 2)];
        Point::new(
            (h[(0, 0)] * p.x + h[(0, 1)] * p.y + h[(0, 2)]) / w,
            (h[(1, 0)] * p.x + h[(1, 1)] * p.y + h[(1, 2)]) / w,
        )
    }

    /// Transform a batch of points with a single 3xN matrix product
    pub fn transform_points(&self, points: &[Point]) -> Vec<Point> {
        let homogeneous =
            Matrix3xX::from_iterator(points.len(), points.iter().flat_map(|p| [p.x, p.y, 1.0]));
        let mapped = self.matrix * homogeneous;
        mapped
            .column_iter()
            .map(|c| Point::new(c[0] / c[2], c[1] / c[2]))
            .collect()
    }
}

/// Compute a 3x3 homography matrix from 4 point correspondences
/// using the Direct Linear Transform (DLT) algorithm with h33 fixed to 1
fn compute_homography(src: &Quad, dst: &Quad) -> Option<Matrix3<f64>> {
    // For each correspondence (x,y) -> (x',y'):
    // x*h1 + y*h2 + h3 - x'*x*h7 - x'*y*h8 = x'
    // x*h4 + y*h5 + h6 - y'*x*h7 - y'*y*h8 = y'
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for i in 0..4 {
        let Point { x, y } = src[i];
        let Point { x: xp, y: yp } = dst[i];

        let row1 = i * 2;
        let row2 = i * 2 + 1;

        a[(row1, 0)] = x;
        a[(row1, 1)] = y;
        a[(row1, 2)] = 1.0;
        a[(row1, 6)] = -xp * x;
        a[(row1, 7)] = -xp * y;
        b[row1] = xp;

        a[(row2, 3)] = x;
        a[(row2, 4)] = y;
        a[(row2, 5)] = 1.0;
        a[(row2, 6)] = -yp * x;
        a[(row2, 7)] = -yp * y;
        b[row2] = yp;
    }

    let h = a.lu().solve(&b)?;
    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0))
}

/// Map normalized unit-square points onto the pixel quadrilateral `quad`
pub fn project(uv: &[Point], quad: &Quad, limits: &QuadLimits) -> Result<Vec<Point>> {
    let transform = PerspectiveTransform::from_unit_square(quad, limits)?;
    let points = transform.transform_points(uv);
    if points.iter().any(|p| !p.is_finite()) {
        return Err(Error::degenerate("projection produced non-finite coordinates"));
    }
    Ok(points)
}

/// Patch centers and pixel extents after projection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectedGrid {
    pub points: Vec<Point>,
    pub patch_wh: Vec<Size>,
}

/// Project patch centers and measure their extents after projection.
///
/// Each patch contributes its center plus the center offset by its
/// normalized width and by its normalized height; the pixel width and height
/// are the distances from the projected center to the two projected offsets,
/// so keystone and shear are reflected in the sizes.
pub fn project_patches(
    centers: &[Point],
    extents: &[Size],
    quad: &Quad,
    limits: &QuadLimits,
) -> Result<ProjectedGrid> {
    if centers.len() != extents.len() {
        return Err(Error::dimension("patch extents", centers.len(), extents.len()));
    }

    let n = centers.len();
    let mut batch = Vec::with_capacity(n * 3);
    batch.extend_from_slice(centers);
    batch.extend(centers.iter().zip(extents).map(|(c, e)| Point::new(c.x + e.w, c.y)));
    batch.extend(centers.iter().zip(extents).map(|(c, e)| Point::new(c.x, c.y + e.h)));

    let mapped = project(&batch, quad, limits)?;
    let (points, offsets) = mapped.split_at(n);
    let patch_wh = (0..n)
        .map(|i| {
            Size::new(
                points[i].distance(&offsets[i]),
                points[i].distance(&offsets[n + i]),
            )
        })
        .collect();

    debug!("Projected {} patches", n);
    Ok(ProjectedGrid {
        points: points.to_vec(),
        patch_wh,
    })
}

/// Whether `p` lies strictly inside a convex quad given in quad order
pub fn contains(quad: &Quad, p: Point) -> bool {
    // Walk the outline TL -> TR -> BR -> BL
    let outline = [quad[0], quad[1], quad[3], quad[2]];
    let mut sign = 0.0f64;
    for i in 0..4 {
        let a = outline[i];
        let b = outline[(i + 1) % 4];
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Quad {
        [
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(0.0, size),
            Point::new(size, size),
        ]
    }

    fn skewed() -> Quad {
        [
            Point::new(40.0, 30.0),
            Point::new(610.0, 55.0),
            Point::new(25.0, 420.0),
            Point::new(640.0, 470.0),
        ]
    }

    #[test]
    fn test_identity_transform() {
        let transform = PerspectiveTransform::compute(&UNIT_SQUARE, &UNIT_SQUARE).unwrap();
        let p = transform.transform_point(Point::new(0.5, 0.5));
        assert!((p.x - 0.5).abs() < 1e-9);
        assert!((p.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_corner_fidelity() {
        let quads = [
            square(100.0),
            skewed(),
            [
                Point::new(500.0, 100.0),
                Point::new(900.0, 300.0),
                Point::new(300.0, 500.0),
                Point::new(700.0, 700.0),
            ],
        ];
        for quad in quads.iter() {
            let mapped = project(&UNIT_SQUARE, quad, &QuadLimits::default()).unwrap();
            for (m, q) in mapped.iter().zip(quad.iter()) {
                assert!(m.distance(q) < 1e-3, "{:?} != {:?}", m, q);
            }
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let transform =
            PerspectiveTransform::from_unit_square(&skewed(), &QuadLimits::default()).unwrap();
        let uv: Vec<Point> = (0..25)
            .map(|i| Point::new((i % 5) as f64 / 4.0, (i / 5) as f64 / 4.0))
            .collect();
        let batch = transform.transform_points(&uv);
        for (p, b) in uv.iter().zip(batch.iter()) {
            assert!(transform.transform_point(*p).distance(b) < 1e-9);
        }
    }

    #[test]
    fn test_interior_containment() {
        let quad = skewed();
        let uv: Vec<Point> = (1..10)
            .flat_map(|i| (1..10).map(move |j| Point::new(i as f64 / 10.0, j as f64 / 10.0)))
            .collect();
        let mapped = project(&uv, &quad, &QuadLimits::default()).unwrap();
        for p in mapped {
            assert!(contains(&quad, p), "{:?} escaped the quad", p);
        }
    }

    #[test]
    fn test_close_corners_rejected() {
        let mut quad = square(100.0);
        quad[1] = Point::new(3.0, 2.0);
        let err = project(&UNIT_SQUARE, &quad, &QuadLimits::default()).unwrap_err();
        assert!(matches!(err, Error::DegenerateQuad { .. }));

        // Coincident corners count as too close
        let mut quad = square(100.0);
        quad[3] = quad[2];
        assert!(validate_quad(&quad, &QuadLimits::default()).is_err());
    }

    #[test]
    fn test_small_area_rejected() {
        // 30x30 square: |cross| = 900 < 1024
        assert!(validate_quad(&square(30.0), &QuadLimits::default()).is_err());
        // 33x33 square: |cross| = 1089
        assert!(validate_quad(&square(33.0), &QuadLimits::default()).is_ok());
    }

    #[test]
    fn test_project_patches_sizes() {
        let centers = [Point::new(0.25, 0.25), Point::new(0.75, 0.75)];
        let extents = [Size::new(0.1, 0.1), Size::new(0.2, 0.05)];
        let grid =
            project_patches(&centers, &extents, &square(200.0), &QuadLimits::default()).unwrap();
        assert!(grid.points[0].distance(&Point::new(50.0, 50.0)) < 1e-6);
        assert!((grid.patch_wh[0].w - 20.0).abs() < 1e-6);
        assert!((grid.patch_wh[1].w - 40.0).abs() < 1e-6);
        assert!((grid.patch_wh[1].h - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_keystone_shrinks_far_patches() {
        // Top edge narrower than bottom edge
        let quad = [
            Point::new(150.0, 0.0),
            Point::new(250.0, 0.0),
            Point::new(0.0, 400.0),
            Point::new(400.0, 400.0),
        ];
        let centers = [Point::new(0.5, 0.1), Point::new(0.5, 0.9)];
        let extents = [Size::new(0.1, 0.1), Size::new(0.1, 0.1)];
        let grid = project_patches(&centers, &extents, &quad, &QuadLimits::default()).unwrap();
        assert!(grid.patch_wh[0].w < grid.patch_wh[1].w);
    }

    #[test]
    fn test_mismatched_extents() {
        let err = project_patches(
            &[Point::new(0.5, 0.5)],
            &[],
            &square(100.0),
            &QuadLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { .. }));
    }
}
