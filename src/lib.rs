//! patchgrid - colour chart patch location, sampling and quality scoring
//!
//! A reference chart ([`ChartDefinition`]) is placed on a captured image by
//! four corner points ([`WorkingGrid`]); every patch is projected through a
//! homography, sampled with a size-adaptive strategy ([`sampler::sample`]) and
//! graded against a downstream workflow ([`Workflow`]).

pub mod adopt;
pub mod analysis;
pub mod chart;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod image_source;
pub mod mosaic;
pub mod quality;
pub mod sampler;
pub mod stats;
pub mod transform;
pub mod workflow;

pub use adopt::{Adoption, Rotation};
pub use analysis::{analyze, CaptureAnalysisResult, PatchResult};
pub use chart::{ChartDefinition, PatchDef};
pub use error::{Error, Result};
pub use geometry::{CornerId, Point, Quad, Size};
pub use grid::{GridConfig, WorkingGrid};
pub use image_source::{PatchBox, PatchPixels, SourceImage};
pub use mosaic::{CfaPattern, MosaicInfo};
pub use quality::{CaptureReport, PatchVerdict, Tier};
pub use sampler::{PatchSample, SamplerConfig, SamplingMethod};
pub use transform::{project, project_patches, ProjectedGrid, QuadLimits};
pub use workflow::Workflow;
