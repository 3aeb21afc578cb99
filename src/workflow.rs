//! Downstream colour-management workflows and their scoring presets
//!
//! The numbers here are tuned photographic judgement calls, not derived
//! quantities. Per-patch presets grade single samples; capture presets grade
//! a whole chart capture.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Artifact a calibration capture is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Workflow {
    #[serde(rename = "DCP")]
    Dcp,
    #[serde(rename = "ICC")]
    Icc,
    #[serde(rename = "LUT")]
    Lut,
    #[serde(rename = "Cineon")]
    Cineon,
    #[serde(rename = "ICC_NEGATIVE")]
    IccNegative,
    #[serde(rename = "LUT_COLOR_NEG", alias = "LUT_COLOUR_NEG")]
    LutColorNeg,
    #[serde(rename = "LUT_BW_NEG")]
    LutBwNeg,
}

/// Weights, tolerances and tier thresholds for grading one patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchProfile {
    pub delta_weight: f64,
    pub noise_weight: f64,
    pub edge_weight: f64,
    pub reliable_weight: f64,
    pub delta_tolerance: f64,
    pub noise_tolerance: f64,
    pub edge_tolerance: f64,
    /// Tier cut-offs; a combined score below more of them is a worse tier
    pub thresholds: [f64; 4],
}

/// Weights, tolerances and wording for grading a whole capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureProfile {
    pub accuracy_weight: f64,
    pub stability_weight: f64,
    pub reliability_weight: f64,
    pub accuracy_tolerance: f64,
    pub stability_tolerance: f64,
    pub thresholds: [f64; 4],
    pub delta_e: [&'static str; 4],
    pub grades: [&'static str; 4],
    pub use_cases: [&'static str; 4],
    pub recommendations: [&'static str; 4],
}

/// Software and handling notes for the produced artifact
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkflowNotes {
    pub software: &'static str,
    pub file_format: &'static str,
    pub installation: &'static str,
    pub critical_factors: [&'static str; 3],
}

const GENERIC_USE_CASES: [&str; 4] = ["General use"; 4];
const GENERIC_RECOMMENDATIONS: [&str; 4] = ["Check workflow configuration"; 4];

const DCP_PATCH: PatchProfile = PatchProfile {
    delta_weight: 0.4,
    noise_weight: 0.3,
    edge_weight: 0.2,
    reliable_weight: 0.1,
    delta_tolerance: 0.004,
    noise_tolerance: 8.0,
    edge_tolerance: 0.1,
    thresholds: [0.6, 0.7, 0.8, 0.9],
};

const ICC_PATCH: PatchProfile = PatchProfile {
    delta_weight: 0.5,
    noise_weight: 0.25,
    edge_weight: 0.15,
    reliable_weight: 0.1,
    delta_tolerance: 0.003,
    noise_tolerance: 6.0,
    edge_tolerance: 0.08,
    thresholds: [0.65, 0.75, 0.85, 0.95],
};

const LUT_PATCH: PatchProfile = PatchProfile {
    delta_weight: 0.35,
    noise_weight: 0.35,
    edge_weight: 0.2,
    reliable_weight: 0.1,
    delta_tolerance: 0.005,
    noise_tolerance: 10.0,
    edge_tolerance: 0.12,
    thresholds: [0.55, 0.65, 0.75, 0.85],
};

// Film presets are softer on noise and edges to tolerate grain
const ICC_NEGATIVE_PATCH: PatchProfile = PatchProfile {
    delta_weight: 0.4,
    noise_weight: 0.2,
    edge_weight: 0.3,
    reliable_weight: 0.1,
    delta_tolerance: 0.006,
    noise_tolerance: 18.0,
    edge_tolerance: 0.15,
    // Last step repeats the first; the tier count still only grows as the score drops
    thresholds: [0.58, 0.68, 0.78, 0.58],
};

const LUT_COLOR_NEG_PATCH: PatchProfile = PatchProfile {
    delta_weight: 0.35,
    noise_weight: 0.2,
    edge_weight: 0.35,
    reliable_weight: 0.1,
    delta_tolerance: 0.007,
    noise_tolerance: 20.0,
    edge_tolerance: 0.18,
    thresholds: [0.52, 0.62, 0.72, 0.82],
};

const LUT_BW_NEG_PATCH: PatchProfile = PatchProfile {
    delta_weight: 0.4,
    noise_weight: 0.15,
    edge_weight: 0.35,
    reliable_weight: 0.1,
    delta_tolerance: 0.008,
    noise_tolerance: 25.0,
    edge_tolerance: 0.20,
    thresholds: [0.50, 0.60, 0.70, 0.80],
};

const DCP_CAPTURE: CaptureProfile = CaptureProfile {
    accuracy_weight: 0.5,
    stability_weight: 0.3,
    reliability_weight: 0.2,
    accuracy_tolerance: 0.01,
    stability_tolerance: 25.0,
    thresholds: [0.6, 0.7, 0.8, 0.9],
    delta_e: ["< 1.5 ΔE", "< 2.0 ΔE", "< 3.0 ΔE", "< 4.0 ΔE"],
    grades: ["A+ PROFESSIONAL", "A HIGH QUALITY", "B+ GOOD", "B ACCEPTABLE"],
    use_cases: [
        "Commercial RAW processing, Capture One workflow",
        "Professional photography, Adobe Camera Raw",
        "Amateur photography, general RAW editing",
        "Basic RAW processing, social media",
    ],
    recommendations: [
        "Excellent DCP profile, use for all camera work",
        "Very good profile for professional workflows",
        "Suitable for most photography applications",
        "Usable but consider lighting improvements",
    ],
};

const ICC_CAPTURE: CaptureProfile = CaptureProfile {
    accuracy_weight: 0.6,
    stability_weight: 0.25,
    reliability_weight: 0.15,
    accuracy_tolerance: 0.008,
    stability_tolerance: 20.0,
    thresholds: [0.65, 0.75, 0.85, 0.95],
    delta_e: ["< 1.0 ΔE", "< 1.5 ΔE", "< 2.5 ΔE", "< 3.5 ΔE"],
    grades: ["A+ PROFESSIONAL", "A HIGH QUALITY", "B+ GOOD", "B ACCEPTABLE"],
    use_cases: [
        "Commercial printing, critical color matching",
        "Professional photography, fine art printing",
        "General photography, web publishing",
        "Basic photo editing, amateur use",
    ],
    recommendations: [
        "Perfect ICC profile for professional work",
        "Excellent for color-critical applications",
        "Good for general photography workflows",
        "Consider measurement improvements",
    ],
};

const LUT_CAPTURE: CaptureProfile = CaptureProfile {
    accuracy_weight: 0.4,
    stability_weight: 0.4,
    reliability_weight: 0.2,
    accuracy_tolerance: 0.012,
    stability_tolerance: 20.0,
    thresholds: [0.55, 0.65, 0.75, 0.85],
    delta_e: ["< 2.0 ΔE", "< 3.0 ΔE", "< 4.5 ΔE", "< 6.0 ΔE"],
    grades: ["A+ EXCELLENT", "A VERY GOOD", "B+ GOOD", "B ACCEPTABLE"],
    use_cases: [
        "Professional color grading, cinema workflow",
        "Commercial photography, advertising",
        "Content creation, social media",
        "Basic color correction",
    ],
    recommendations: [
        "Perfect LUT for professional color grading",
        "Excellent for commercial applications",
        "Good for creative workflows",
        "Basic quality, suitable for simple tasks",
    ],
};

const CINEON_CAPTURE: CaptureProfile = CaptureProfile {
    use_cases: GENERIC_USE_CASES,
    recommendations: GENERIC_RECOMMENDATIONS,
    ..LUT_CAPTURE
};

const ICC_NEGATIVE_CAPTURE: CaptureProfile = CaptureProfile {
    accuracy_weight: 0.45,
    stability_weight: 0.35,
    reliability_weight: 0.2,
    accuracy_tolerance: 0.015,
    stability_tolerance: 18.0,
    thresholds: [0.58, 0.68, 0.78, 0.88],
    delta_e: ["< 2.5 ΔE", "< 4.0 ΔE", "< 6.0 ΔE", "< 8.0 ΔE"],
    grades: ["A+ EXCELLENT", "A VERY GOOD", "B+ GOOD", "B NEEDS WORK"],
    use_cases: [
        "Professional film scanning, archival work",
        "Commercial film digitization",
        "Personal film conversion projects",
        "Basic film scanning",
    ],
    recommendations: [
        "Excellent for C1 negative workflow",
        "Very good for professional film work",
        "Suitable for most film conversion needs",
        "Consider improving scan conditions",
    ],
};

const LUT_COLOR_NEG_CAPTURE: CaptureProfile = CaptureProfile {
    accuracy_weight: 0.35,
    stability_weight: 0.45,
    reliability_weight: 0.2,
    accuracy_tolerance: 0.018,
    stability_tolerance: 15.0,
    thresholds: [0.52, 0.62, 0.72, 0.82],
    delta_e: ["< 3.5 ΔE", "< 5.0 ΔE", "< 7.0 ΔE", "< 9.0 ΔE"],
    grades: ["A+ EXCELLENT", "A VERY GOOD", "B+ GOOD", "B BASIC QUALITY"],
    use_cases: [
        "Professional film restoration, cinema",
        "Commercial film digitization, broadcast",
        "Personal film projects, social sharing",
        "Basic film conversion",
    ],
    recommendations: [
        "Perfect for Cineon/Luminar/LR negative workflow",
        "Excellent for professional film digitization",
        "Good for amateur film conversion projects",
        "Basic quality, check lighting setup",
    ],
};

const LUT_BW_NEG_CAPTURE: CaptureProfile = CaptureProfile {
    accuracy_weight: 0.3,
    stability_weight: 0.5,
    reliability_weight: 0.2,
    accuracy_tolerance: 0.020,
    stability_tolerance: 12.0,
    thresholds: [0.50, 0.60, 0.70, 0.80],
    delta_e: [
        "Excellent tonal range",
        "Very good tones",
        "Good tones",
        "Basic quality",
    ],
    grades: ["A+ ARCHIVAL", "A PROFESSIONAL", "B+ GOOD", "B AMATEUR"],
    use_cases: [
        "Archival B&W film digitization",
        "Professional B&W photography workflow",
        "Personal B&W film projects",
        "Basic B&W negative conversion",
    ],
    recommendations: [
        "Excellent tonal reproduction, archival quality",
        "Professional B&W workflow ready",
        "Good for personal B&W film projects",
        "Basic quality, consider noise reduction",
    ],
};

impl Workflow {
    pub const ALL: [Workflow; 7] = [
        Workflow::Dcp,
        Workflow::Icc,
        Workflow::Lut,
        Workflow::Cineon,
        Workflow::IccNegative,
        Workflow::LutColorNeg,
        Workflow::LutBwNeg,
    ];

    pub const DEFAULT: Workflow = Workflow::Dcp;

    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Dcp => "DCP",
            Workflow::Icc => "ICC",
            Workflow::Lut => "LUT",
            Workflow::Cineon => "Cineon",
            Workflow::IccNegative => "ICC_NEGATIVE",
            Workflow::LutColorNeg => "LUT_COLOR_NEG",
            Workflow::LutBwNeg => "LUT_BW_NEG",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Workflow::IccNegative | Workflow::LutColorNeg | Workflow::LutBwNeg
        )
    }

    /// Parse a workflow key, falling back to [`Workflow::DEFAULT`].
    ///
    /// The unrecognised key is returned alongside so callers can report it.
    pub fn resolve(key: &str) -> (Workflow, Option<String>) {
        match key.parse() {
            Ok(workflow) => (workflow, None),
            Err(_) => {
                warn!(
                    "Unknown workflow '{}', using {}",
                    key,
                    Workflow::DEFAULT.as_str()
                );
                (Workflow::DEFAULT, Some(key.to_string()))
            }
        }
    }

    /// Swap a positive workflow for its film-negative counterpart
    pub fn for_film(self, negative: bool) -> Workflow {
        if !negative || self.is_negative() {
            return self;
        }
        match self {
            Workflow::Lut => Workflow::LutColorNeg,
            _ => Workflow::IccNegative,
        }
    }

    pub fn patch_profile(&self) -> &'static PatchProfile {
        match self {
            Workflow::Dcp => &DCP_PATCH,
            Workflow::Icc => &ICC_PATCH,
            Workflow::Lut | Workflow::Cineon => &LUT_PATCH,
            Workflow::IccNegative => &ICC_NEGATIVE_PATCH,
            Workflow::LutColorNeg => &LUT_COLOR_NEG_PATCH,
            Workflow::LutBwNeg => &LUT_BW_NEG_PATCH,
        }
    }

    pub fn capture_profile(&self) -> &'static CaptureProfile {
        match self {
            Workflow::Dcp => &DCP_CAPTURE,
            Workflow::Icc => &ICC_CAPTURE,
            Workflow::Lut => &LUT_CAPTURE,
            Workflow::Cineon => &CINEON_CAPTURE,
            Workflow::IccNegative => &ICC_NEGATIVE_CAPTURE,
            Workflow::LutColorNeg => &LUT_COLOR_NEG_CAPTURE,
            Workflow::LutBwNeg => &LUT_BW_NEG_CAPTURE,
        }
    }

    pub fn notes(&self) -> Option<WorkflowNotes> {
        let notes = match self {
            Workflow::Dcp => WorkflowNotes {
                software: "Adobe Camera Raw, Lightroom, Capture One",
                file_format: ".dcp profile file",
                installation: "Camera Profiles folder",
                critical_factors: [
                    "Consistent lighting",
                    "Proper exposure",
                    "Color temperature accuracy",
                ],
            },
            Workflow::Icc => WorkflowNotes {
                software: "Photoshop, Capture One, most photo editors",
                file_format: ".icc/.icm profile file",
                installation: "System color profiles folder",
                critical_factors: [
                    "Monitor calibration",
                    "Viewing conditions",
                    "Profile embedding",
                ],
            },
            Workflow::Lut => WorkflowNotes {
                software: "DaVinci Resolve, Premiere Pro, FCPX, Luminar",
                file_format: ".cube/.3dl LUT file",
                installation: "Application LUT folders",
                critical_factors: [
                    "Consistent grading setup",
                    "Monitor calibration",
                    "Viewing environment",
                ],
            },
            Workflow::Cineon => return None,
            Workflow::IccNegative => WorkflowNotes {
                software: "Capture One (Film mode), Photoshop",
                file_format: ".icc profile + inversion workflow",
                installation: "C1 Film profiles or system profiles",
                critical_factors: [
                    "Light table color temperature",
                    "Negative flatness",
                    "Dust-free scanning",
                ],
            },
            Workflow::LutColorNeg => WorkflowNotes {
                software: "Cineon tools, Luminar Neo, Lightroom",
                file_format: ".cube LUT with inversion",
                installation: "Application-specific LUT folders",
                critical_factors: [
                    "Known light source temperature",
                    "Orange mask consistency",
                    "Grain vs noise",
                ],
            },
            Workflow::LutBwNeg => WorkflowNotes {
                software: "B&W processing software, general editors",
                file_format: ".cube LUT for tonal mapping",
                installation: "LUT folders or manual application",
                critical_factors: [
                    "Consistent negative density",
                    "Film grain preservation",
                    "Tonal range coverage",
                ],
            },
        };
        Some(notes)
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Workflow::DEFAULT
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workflow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DCP" => Ok(Workflow::Dcp),
            "ICC" => Ok(Workflow::Icc),
            "LUT" => Ok(Workflow::Lut),
            "CINEON" => Ok(Workflow::Cineon),
            "ICC_NEGATIVE" => Ok(Workflow::IccNegative),
            "LUT_COLOR_NEG" | "LUT_COLOUR_NEG" => Ok(Workflow::LutColorNeg),
            "LUT_BW_NEG" => Ok(Workflow::LutBwNeg),
            _ => Err(Error::UnknownWorkflow(s.to_string())),
        }
    }
}
