//! Batch sampling and grading of every patch of a placed chart

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::geometry::{Point, Size};
use crate::grid::WorkingGrid;
use crate::image_source::{PatchBox, SourceImage};
use crate::quality::{classify_components, CaptureReport, ComponentTiers, PatchVerdict};
use crate::sampler::{sample, PatchSample, SamplerConfig};
use crate::workflow::Workflow;

/// Below this many patches sampling stays on the calling thread
pub const PARALLEL_THRESHOLD: usize = 16;

/// Measurement and grade of one patch
#[derive(Debug, Clone, Serialize)]
pub struct PatchResult {
    pub name: String,
    pub center: Point,
    pub size: Size,
    pub region: PatchBox,
    pub sample: PatchSample,
    pub verdict: PatchVerdict,
    pub components: ComponentTiers,
}

/// Results for a whole capture, patches in chart order
#[derive(Debug, Clone, Serialize)]
pub struct CaptureAnalysisResult {
    pub workflow: Workflow,
    pub white_level: f64,
    pub patches: Vec<PatchResult>,
    pub report: CaptureReport,
}

fn sample_with(image: &SourceImage, boxes: &[PatchBox], cfg: &SamplerConfig, parallel: bool) -> Vec<PatchSample> {
    if parallel {
        boxes
            .par_iter()
            .map(|b| sample(&image.region(b), cfg))
            .collect()
    } else {
        boxes.iter().map(|b| sample(&image.region(b), cfg)).collect()
    }
}

/// Sample every box; the output is index-aligned with `boxes`
pub fn sample_boxes(image: &SourceImage, boxes: &[PatchBox], cfg: &SamplerConfig) -> Vec<PatchSample> {
    sample_with(image, boxes, cfg, boxes.len() >= PARALLEL_THRESHOLD)
}

/// Sample and grade every patch of `grid` on `image`
pub fn analyze(
    grid: &WorkingGrid,
    image: &SourceImage,
    cfg: &SamplerConfig,
    workflow: Workflow,
) -> Result<CaptureAnalysisResult> {
    let (w, h) = grid.image_size();
    if (w, h) != (image.width(), image.height()) {
        return Err(Error::ImageMismatch(format!(
            "grid placed on {}x{}, image is {}x{}",
            w,
            h,
            image.width(),
            image.height()
        )));
    }

    let boxes = grid.sampling_boxes();
    let samples = sample_boxes(image, &boxes, cfg);
    let white_level = image.white_level();

    let patches: Vec<PatchResult> = grid
        .chart()
        .patches()
        .iter()
        .zip(grid.points().iter().zip(grid.patch_wh()))
        .zip(boxes.iter().zip(&samples))
        .map(|((def, (&center, &size)), (&region, sample))| PatchResult {
            name: def.name.clone(),
            center,
            size,
            region,
            verdict: PatchVerdict::new(sample, workflow, white_level),
            components: classify_components(sample, workflow),
            sample: sample.clone(),
        })
        .collect();

    let report = CaptureReport::new(&samples, workflow, white_level);
    let reliable = samples.iter().filter(|s| s.reliable).count();
    info!(
        "Sampled {} patches, {} reliable, grade {}",
        samples.len(),
        reliable,
        report.quality.grade
    );

    Ok(CaptureAnalysisResult {
        workflow,
        white_level,
        patches,
        report,
    })
}
