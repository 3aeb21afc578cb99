use std::sync::Arc;

use patchgrid::adopt::{fit, FALLBACK_MARGIN};
use patchgrid::geometry::fits_inside;
use patchgrid::{
    analyze, project_patches, Adoption, CfaPattern, ChartDefinition, GridConfig, Point, Quad,
    QuadLimits, Rotation, SamplerConfig, SamplingMethod, SourceImage, Tier, WorkingGrid, Workflow,
};

fn chart(extent: f64, corner_ref: &str) -> Arc<ChartDefinition> {
    let json = format!(
        r#"{{
            "patches": [
                {{"name": "A1", "center": [0.25, 0.25], "extent": [{e}, {e}], "xyz": [41.2, 21.3, 1.9]}},
                {{"name": "A2", "center": [0.75, 0.25], "extent": [{e}, {e}], "xyz": [35.8, 71.5, 11.9]}},
                {{"name": "B1", "center": [0.25, 0.75], "extent": [{e}, {e}], "xyz": [18.0, 7.2, 95.0]}},
                {{"name": "B2", "center": [0.75, 0.75], "extent": [{e}, {e}], "xyz": [20.0, 21.0, 23.0]}}
            ],
            "corner_ref": {corner_ref}
        }}"#,
        e = extent,
        corner_ref = corner_ref
    );
    Arc::new(ChartDefinition::from_json(&json).unwrap())
}

fn quad(pts: [(f64, f64); 4]) -> Quad {
    pts.map(Point::from)
}

#[test]
fn four_patch_chart_projects_onto_square() {
    let chart = chart(0.1, "[[0, 0], [1, 0], [0, 1], [1, 1]]");
    let corners = quad([(0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (100.0, 100.0)]);

    let projected = project_patches(
        &chart.centers(),
        &chart.extents(),
        &corners,
        &QuadLimits::default(),
    )
    .unwrap();

    let expected = [(25.0, 25.0), (75.0, 25.0), (25.0, 75.0), (75.0, 75.0)];
    for (i, (x, y)) in expected.into_iter().enumerate() {
        assert!(projected.points[i].distance(&Point::new(x, y)) < 1e-6);
        assert!((projected.patch_wh[i].w - 10.0).abs() < 1e-6);
        assert!((projected.patch_wh[i].h - 10.0).abs() < 1e-6);
    }

    // The working grid lands on the same layout
    let grid = WorkingGrid::attach(chart, 100, 100, &GridConfig::default()).unwrap();
    assert_eq!(*grid.corners(), corners);
    for (a, b) in grid.points().iter().zip(&projected.points) {
        assert!(a.distance(b) < 1e-6);
    }
}

#[test]
fn landscape_chart_rotates_onto_portrait_image() {
    // 150 x 80 chart hanging off the left edge of a 100 x 200 image
    let mut corners = quad([(-60.0, 10.0), (90.0, 10.0), (-60.0, 90.0), (90.0, 90.0)]);
    let outcome = fit(&mut corners, 100, 200, Rotation::Auto, FALLBACK_MARGIN);

    assert_eq!(outcome, Adoption::Rotated(1));
    assert!(fits_inside(&corners, 100.0, 200.0));
    assert_eq!(
        corners,
        quad([(10.0, 160.0), (10.0, 10.0), (90.0, 160.0), (90.0, 10.0)])
    );

    // Same through the editor: place the corners, then adopt
    let chart = chart(0.1, "[[0, 0], [150, 0], [0, 80], [150, 80]]");
    let mut grid = WorkingGrid::attach(chart, 100, 200, &GridConfig::default()).unwrap();
    grid.set_corners(quad([(-60.0, 10.0), (90.0, 10.0), (-60.0, 90.0), (90.0, 90.0)]))
        .unwrap();
    assert_eq!(grid.adopt(Rotation::Auto).unwrap(), Adoption::Rotated(1));
    assert_eq!(*grid.corners(), corners);
    assert!(fits_inside(grid.points(), 100.0, 200.0));
}

#[test]
fn raw_mosaic_capture_keeps_channels_apart() {
    let (w, h) = (200u32, 200u32);
    let pattern = CfaPattern::RGGB;
    let levels = [1000u16, 2000, 3000];
    let data = (0..w * h)
        .map(|i| levels[pattern.channel_at((i % w) as usize, (i / w) as usize)])
        .collect();
    let image = SourceImage::from_mosaic(w, h, data, pattern, 4095.0).unwrap();

    let grid = WorkingGrid::attach(
        chart(0.35, "[[0, 0], [1, 0], [0, 1], [1, 1]]"),
        w,
        h,
        &GridConfig::default(),
    )
    .unwrap();
    let result = analyze(&grid, &image, &SamplerConfig::default(), Workflow::Dcp).unwrap();

    for patch in &result.patches {
        assert_ne!(patch.sample.method, SamplingMethod::NotApplicable);
        for c in 0..3 {
            assert!(
                (patch.sample.mean_rgb[c] - levels[c] as f64).abs() < 1e-6,
                "{} {:?}",
                patch.name,
                patch.sample.mean_rgb
            );
        }
        assert!(patch.sample.reliable);
    }
}

#[test]
fn shrinking_patches_drops_them_out_of_scale() {
    let image = SourceImage::from_rgb8(100, 100, vec![90; 100 * 100 * 3]).unwrap();
    let mut grid = WorkingGrid::attach(
        chart(0.3, "[[0, 0], [1, 0], [0, 1], [1, 1]]"),
        100,
        100,
        &GridConfig::default(),
    )
    .unwrap();

    let full = analyze(&grid, &image, &SamplerConfig::default(), Workflow::Icc).unwrap();
    assert!(full.patches.iter().all(|p| p.verdict.tier == Tier::Grade(0)));

    grid.set_scale(50);
    let small = analyze(&grid, &image, &SamplerConfig::default(), Workflow::Icc).unwrap();
    assert!(small.patches.iter().all(|p| p.verdict.tier == Tier::OutOfScale));
    assert_eq!(small.report.analysis.reliable_patches, 0);
}

#[test]
fn unknown_workflow_falls_back_to_dcp() {
    let (workflow, unknown) = Workflow::resolve("HALD_CLUT");
    assert_eq!(workflow, Workflow::Dcp);
    assert_eq!(unknown.as_deref(), Some("HALD_CLUT"));
}
