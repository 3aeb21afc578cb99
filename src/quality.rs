//! Quality grading of patch samples and whole captures

use std::fmt;

use serde::Serialize;

use crate::color::{Rgb8, NON_RELIABLE_COLOUR, OUT_OF_SCALE_COLOUR, TIER_COLOURS};
use crate::sampler::PatchSample;
use crate::stats::{mean, std_dev};
use crate::workflow::{Workflow, WorkflowNotes};

/// Ordinal quality bucket of one patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    /// 0 (best) to 4 (worst)
    Grade(u8),
    /// Sample failed the reliability gate
    NonReliable,
    /// Patch too small to sample
    OutOfScale,
}

impl Tier {
    pub const WORST_GRADE: u8 = 4;

    /// Ordering key; larger is worse
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Grade(g) => *g,
            Tier::NonReliable => 5,
            Tier::OutOfScale => 6,
        }
    }

    pub fn colour(&self) -> Rgb8 {
        match self {
            Tier::Grade(g) => Rgb8::from_packed(TIER_COLOURS[(*g).min(Self::WORST_GRADE) as usize]),
            Tier::NonReliable => Rgb8::from_packed(NON_RELIABLE_COLOUR),
            Tier::OutOfScale => Rgb8::from_packed(OUT_OF_SCALE_COLOUR),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Grade(g) => write!(f, "tier {}", g),
            Tier::NonReliable => f.write_str("non-reliable"),
            Tier::OutOfScale => f.write_str("out of scale"),
        }
    }
}

/// Number of thresholds the score falls short of: 0 best, 4 worst
fn grade_index(score: f64, thresholds: &[f64; 4]) -> u8 {
    thresholds.iter().filter(|&&t| score < t).count() as u8
}

/// `1 - raw / tolerance`, clamped to 0..1
fn goodness(raw: f64, tolerance: f64) -> f64 {
    (1.0 - raw / tolerance).clamp(0.0, 1.0)
}

/// Per-input goodness of a sample under a workflow's patch preset
#[derive(Debug, Clone, Copy, PartialEq)]
struct Components {
    delta: f64,
    noise: f64,
    edge: f64,
    reliable: f64,
}

impl Components {
    fn of(sample: &PatchSample, workflow: Workflow) -> Self {
        let p = workflow.patch_profile();
        Self {
            delta: goodness(sample.normalized_delta, p.delta_tolerance),
            noise: goodness(mean(&sample.std_rgb), p.noise_tolerance),
            edge: goodness(sample.edge_score, p.edge_tolerance),
            reliable: if sample.reliable { 1.0 } else { 0.0 },
        }
    }

    fn weighted(&self, workflow: Workflow) -> f64 {
        let p = workflow.patch_profile();
        self.delta * p.delta_weight
            + self.noise * p.noise_weight
            + self.edge * p.edge_weight
            + self.reliable * p.reliable_weight
    }
}

/// Combined goodness score of a sample, 0..1
pub fn patch_score(sample: &PatchSample, workflow: Workflow) -> f64 {
    Components::of(sample, workflow).weighted(workflow)
}

/// Grade one sample. Unreliable samples are gated out regardless of score.
pub fn classify(sample: &PatchSample, workflow: Workflow) -> Tier {
    if !sample.is_applicable() {
        return Tier::OutOfScale;
    }
    if !sample.reliable {
        return Tier::NonReliable;
    }
    let score = patch_score(sample, workflow);
    Tier::Grade(grade_index(score, &workflow.patch_profile().thresholds))
}

/// Grade of each scoring input on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentTiers {
    pub normalized_delta: u8,
    pub std_rgb: u8,
    pub edge_score: u8,
    pub reliable: u8,
}

pub fn classify_components(sample: &PatchSample, workflow: Workflow) -> ComponentTiers {
    let c = Components::of(sample, workflow);
    let t = &workflow.patch_profile().thresholds;
    ComponentTiers {
        normalized_delta: grade_index(c.delta, t),
        std_rgb: grade_index(c.noise, t),
        edge_score: grade_index(c.edge, t),
        reliable: grade_index(c.reliable, t),
    }
}

/// Overlay data for one patch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatchVerdict {
    pub tier: Tier,
    pub tier_colour: Rgb8,
    pub mean_preview: Rgb8,
    pub median_preview: Rgb8,
}

impl PatchVerdict {
    pub fn new(sample: &PatchSample, workflow: Workflow, white_level: f64) -> Self {
        let tier = classify(sample, workflow);
        Self {
            tier,
            tier_colour: tier.colour(),
            mean_preview: Rgb8::from_normalized(sample.mean_normalized(white_level)),
            median_preview: Rgb8::from_normalized(sample.median_normalized(white_level)),
        }
    }
}

pub fn evaluate_patches(
    samples: &[PatchSample],
    workflow: Workflow,
    white_level: f64,
) -> Vec<PatchVerdict> {
    samples
        .iter()
        .map(|s| PatchVerdict::new(s, workflow, white_level))
        .collect()
}

/// Capture-wide measurement statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureAnalysis {
    pub patch_count: usize,
    pub reliable_patches: usize,
    pub reliability_rate: f64,
    /// Mean across-patch channel spread relative to the white level
    pub mean_accuracy: f64,
    /// Across-patch standard deviation per channel
    pub stability_rgb: [f64; 3],
    pub rgb_range: [f64; 2],
    pub dynamic_range: f64,
}

impl CaptureAnalysis {
    /// Summarise the applicable samples of one capture.
    ///
    /// `mean_accuracy` is divided by `white_level` (255 for 8-bit, 65535 for
    /// 16-bit sources) so 8-bit and 16-bit captures of the same chart report
    /// comparable accuracy.
    pub fn from_samples(samples: &[PatchSample], white_level: f64) -> Self {
        let measured: Vec<&PatchSample> = samples.iter().filter(|s| s.is_applicable()).collect();
        if measured.is_empty() {
            return Self {
                patch_count: samples.len(),
                reliable_patches: 0,
                reliability_rate: 0.0,
                mean_accuracy: 1.0,
                stability_rgb: [100.0; 3],
                rgb_range: [0.0, 0.0],
                dynamic_range: 1.0,
            };
        }

        let reliable_patches = measured
            .iter()
            .filter(|s| s.reliable && !s.is_blank_or_saturated(white_level))
            .count();

        let stability_rgb = [0, 1, 2].map(|c| {
            let channel: Vec<f64> = measured.iter().map(|s| s.mean_rgb[c]).collect();
            std_dev(&channel)
        });

        let all = measured.iter().flat_map(|s| s.mean_rgb);
        let (min, max) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        Self {
            patch_count: samples.len(),
            reliable_patches,
            reliability_rate: reliable_patches as f64 / samples.len() as f64,
            mean_accuracy: mean(&stability_rgb) / white_level,
            stability_rgb,
            rgb_range: [min, max],
            dynamic_range: max / min.max(1.0),
        }
    }
}

impl fmt::Display for CaptureAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Patches analyzed: {}", self.patch_count)?;
        writeln!(
            f,
            "Reliable measurements: {} ({:.1}%)",
            self.reliable_patches,
            self.reliability_rate * 100.0
        )?;
        writeln!(f, "Average measurement error: {:.6}", self.mean_accuracy)?;
        let s = self.stability_rgb;
        writeln!(
            f,
            "Measurement stability (RGB std): ({:.2}, {:.2}, {:.2})",
            s[0], s[1], s[2]
        )?;
        write!(
            f,
            "Dynamic range: {:.1} - {:.1} ({:.1}:1)",
            self.rgb_range[0], self.rgb_range[1], self.dynamic_range
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetailedScores {
    pub accuracy: f64,
    pub stability: f64,
    pub reliability: f64,
}

/// Predicted suitability of a capture for a workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureQuality {
    pub workflow: Workflow,
    pub score: f64,
    /// 0 best; 4 means below every preset grade
    pub grade_index: usize,
    pub grade: &'static str,
    pub delta_e_expected: &'static str,
    pub use_case: &'static str,
    pub recommendation: &'static str,
    pub detailed_scores: DetailedScores,
    pub notes: Option<WorkflowNotes>,
}

pub fn predict_capture_quality(analysis: &CaptureAnalysis, workflow: Workflow) -> CaptureQuality {
    let p = workflow.capture_profile();

    let accuracy = ((p.accuracy_tolerance - analysis.mean_accuracy) / (p.accuracy_tolerance * 0.9))
        .clamp(0.0, 1.0);
    let worst_stability = analysis
        .stability_rgb
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let stability =
        ((p.stability_tolerance - worst_stability) / (p.stability_tolerance * 0.8)).clamp(0.0, 1.0);
    let reliability = analysis.reliability_rate;

    let score = accuracy * p.accuracy_weight
        + stability * p.stability_weight
        + reliability * p.reliability_weight;
    let grade_index = grade_index(score, &p.thresholds) as usize;

    let (grade, delta_e_expected, use_case, recommendation) = match grade_index {
        i @ 0..=3 => (p.grades[i], p.delta_e[i], p.use_cases[i], p.recommendations[i]),
        _ => (
            "C INSUFFICIENT",
            "Not predictable",
            "Limited use",
            "Needs improvement",
        ),
    };

    CaptureQuality {
        workflow,
        score,
        grade_index,
        grade,
        delta_e_expected,
        use_case,
        recommendation,
        detailed_scores: DetailedScores {
            accuracy,
            stability,
            reliability,
        },
        notes: workflow.notes(),
    }
}

impl fmt::Display for CaptureQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EXPECTED {} QUALITY:", self.workflow)?;
        writeln!(f, "   Overall grade: {}", self.grade)?;
        writeln!(f, "   Expected accuracy: {}", self.delta_e_expected)?;
        writeln!(f, "   Best use case: {}", self.use_case)?;
        write!(f, "   Recommendation: {}", self.recommendation)?;

        if let Some(notes) = &self.notes {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "WORKFLOW TECHNICAL NOTES:")?;
            writeln!(f, "   Software: {}", notes.software)?;
            writeln!(f, "   File format: {}", notes.file_format)?;
            writeln!(f, "   Installation: {}", notes.installation)?;
            write!(f, "   Critical factors: {}", notes.critical_factors.join(", "))?;
        }
        Ok(())
    }
}

/// Measurement statistics and the predicted grade of one capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReport {
    pub analysis: CaptureAnalysis,
    pub quality: CaptureQuality,
}

impl CaptureReport {
    pub fn new(samples: &[PatchSample], workflow: Workflow, white_level: f64) -> Self {
        let analysis = CaptureAnalysis::from_samples(samples, white_level);
        let quality = predict_capture_quality(&analysis, workflow);
        Self { analysis, quality }
    }
}

impl fmt::Display for CaptureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.analysis)?;
        writeln!(f)?;
        write!(f, "{}", self.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SamplingMethod;

    fn clean(mean_rgb: [f64; 3]) -> PatchSample {
        PatchSample {
            mean_rgb,
            median_rgb: mean_rgb,
            std_rgb: [0.0; 3],
            delta: [0.0; 3],
            normalized_delta: 0.0,
            edge_score: 0.0,
            reliable: true,
            method: SamplingMethod::LargePatch,
            pixel_count: 5000,
        }
    }

    #[test]
    fn test_grade_index() {
        let t = [0.6, 0.7, 0.8, 0.9];
        assert_eq!(grade_index(1.0, &t), 0);
        assert_eq!(grade_index(0.9, &t), 0);
        assert_eq!(grade_index(0.85, &t), 1);
        assert_eq!(grade_index(0.0, &t), 4);
    }

    #[test]
    fn test_clean_patch_best_tier() {
        for w in Workflow::ALL {
            assert_eq!(classify(&clean([100.0; 3]), w), Tier::Grade(0), "{}", w);
        }
    }

    #[test]
    fn test_gates() {
        let mut s = clean([100.0; 3]);
        s.reliable = false;
        assert_eq!(classify(&s, Workflow::Dcp), Tier::NonReliable);
        assert_eq!(classify(&PatchSample::not_applicable(0), Workflow::Dcp), Tier::OutOfScale);
        assert_eq!(Tier::NonReliable.colour(), Rgb8::new(255, 0, 0));
        assert_eq!(Tier::Grade(0).colour(), Rgb8::from_packed(0x22C55E));
    }

    #[test]
    fn test_grade_index_with_repeated_cutoff() {
        let t = &Workflow::IccNegative.patch_profile().thresholds;
        assert_eq!(grade_index(0.95, t), 0);
        assert_eq!(grade_index(0.7, t), 1);
        assert_eq!(grade_index(0.6, t), 2);
        // Below 0.58 both the first and the last cut-off are missed
        assert_eq!(grade_index(0.5, t), 4);
        let ranks: Vec<u8> = (0..=100).map(|i| grade_index(i as f64 / 100.0, t)).collect();
        assert!(ranks.windows(2).all(|r| r[0] >= r[1]));
    }

    #[test]
    fn test_monotonic_in_delta_and_edge() {
        for w in Workflow::ALL {
            let mut previous = 0;
            for step in 0..=40 {
                let mut s = clean([100.0; 3]);
                s.normalized_delta = step as f64 * 0.0005;
                let rank = classify(&s, w).rank();
                assert!(rank >= previous, "{} delta step {}", w, step);
                previous = rank;
            }

            let mut previous = 0;
            for step in 0..=40 {
                let mut s = clean([100.0; 3]);
                s.edge_score = step as f64 * 0.01;
                let rank = classify(&s, w).rank();
                assert!(rank >= previous, "{} edge step {}", w, step);
                previous = rank;
            }

            let mut s = clean([100.0; 3]);
            s.normalized_delta = 0.002;
            let before = classify(&s, w).rank();
            s.reliable = false;
            assert!(classify(&s, w).rank() >= before);
        }
    }

    #[test]
    fn test_components() {
        let tiers = classify_components(&clean([50.0; 3]), Workflow::Icc);
        assert_eq!(
            tiers,
            ComponentTiers {
                normalized_delta: 0,
                std_rgb: 0,
                edge_score: 0,
                reliable: 0
            }
        );

        let mut s = clean([50.0; 3]);
        s.reliable = false;
        s.std_rgb = [3.0; 3];
        let tiers = classify_components(&s, Workflow::Icc);
        assert_eq!(tiers.reliable, 4);
        // Noise goodness 0.5 is below every ICC threshold
        assert_eq!(tiers.std_rgb, 4);
    }

    #[test]
    fn test_verdict_previews() {
        let v = PatchVerdict::new(&clean([65535.0, 0.0, 32767.5]), Workflow::Dcp, 65535.0);
        assert_eq!(v.mean_preview, Rgb8::new(255, 0, 127));
        assert_eq!(v.tier_colour, Tier::Grade(0).colour());
    }

    #[test]
    fn test_empty_capture() {
        let a = CaptureAnalysis::from_samples(&[PatchSample::not_applicable(10)], 255.0);
        assert_eq!(a.patch_count, 1);
        assert_eq!(a.reliable_patches, 0);
        assert_eq!(a.mean_accuracy, 1.0);
        assert_eq!(a.stability_rgb, [100.0; 3]);
        assert_eq!(a.dynamic_range, 1.0);
    }

    #[test]
    fn test_capture_statistics() {
        let samples = [clean([100.0; 3]), clean([200.0; 3]), clean([300.0; 3]), clean([0.0; 3])];
        let a = CaptureAnalysis::from_samples(&samples, 65535.0);
        assert_eq!(a.patch_count, 4);
        // The all-zero patch is not counted as reliable
        assert_eq!(a.reliable_patches, 3);
        assert!((a.reliability_rate - 0.75).abs() < 1e-12);
        assert_eq!(a.rgb_range, [0.0, 300.0]);
        assert_eq!(a.dynamic_range, 300.0);
        let expected_std = 12500.0f64.sqrt();
        assert!((a.stability_rgb[1] - expected_std).abs() < 1e-9);
        assert!((a.mean_accuracy - expected_std / 65535.0).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_independent_of_bit_depth() {
        let levels = [[20.0, 40.0, 60.0], [90.0, 120.0, 150.0], [200.0, 210.0, 240.0]];
        let eight: Vec<_> = levels.iter().map(|&l| clean(l)).collect();
        let sixteen: Vec<_> = levels.iter().map(|&l| clean(l.map(|c| c * 257.0))).collect();

        let a8 = CaptureAnalysis::from_samples(&eight, 255.0);
        let a16 = CaptureAnalysis::from_samples(&sixteen, 65535.0);
        assert!((a8.mean_accuracy - a16.mean_accuracy).abs() < 1e-12);
        assert_eq!(a8.reliable_patches, a16.reliable_patches);
    }

    #[test]
    fn test_capture_grades() {
        let perfect = CaptureAnalysis {
            patch_count: 24,
            reliable_patches: 24,
            reliability_rate: 1.0,
            mean_accuracy: 0.0,
            stability_rgb: [0.0; 3],
            rgb_range: [10.0, 200.0],
            dynamic_range: 20.0,
        };
        let q = predict_capture_quality(&perfect, Workflow::Dcp);
        assert_eq!(q.grade_index, 0);
        assert_eq!(q.grade, "A+ PROFESSIONAL");
        assert_eq!(q.delta_e_expected, "< 1.5 ΔE");

        let poor = CaptureAnalysis {
            reliability_rate: 0.0,
            reliable_patches: 0,
            mean_accuracy: 0.5,
            stability_rgb: [500.0; 3],
            ..perfect.clone()
        };
        let q = predict_capture_quality(&poor, Workflow::Dcp);
        assert_eq!(q.grade_index, 4);
        assert_eq!(q.grade, "C INSUFFICIENT");
        assert_eq!(q.use_case, "Limited use");
    }

    #[test]
    fn test_clean_capture_not_worse_than_noisy() {
        let clean_samples: Vec<PatchSample> = (0..12).map(|_| clean([120.0; 3])).collect();
        let noisy_samples: Vec<PatchSample> = (0..12)
            .map(|i| {
                let mut s = clean([120.0 + 15.0 * (i % 3) as f64; 3]);
                s.reliable = i % 2 == 0;
                s
            })
            .collect();
        for w in Workflow::ALL {
            let a = CaptureReport::new(&clean_samples, w, 255.0);
            let b = CaptureReport::new(&noisy_samples, w, 255.0);
            assert!(a.quality.grade_index <= b.quality.grade_index, "{}", w);
            assert!(a.quality.score >= b.quality.score);
        }
    }

    #[test]
    fn test_report_text() {
        let report = CaptureReport::new(&[clean([100.0; 3]), clean([200.0; 3])], Workflow::Lut, 255.0);
        let text = report.to_string();
        assert!(text.contains("Patches analyzed: 2"));
        assert!(text.contains("EXPECTED LUT QUALITY:"));
        assert!(text.contains("DaVinci Resolve"));
    }
}
