//! Frame quality filter.
//!
//! Decides from the service's face-detection attributes whether a captured
//! frame is good enough to be stored as an enrollment face. Evaluation is
//! pure: the same detections and thresholds always give the same report.

use crate::types::{AccessoryKind, DetectedFace, GlassesType};
use serde::Deserialize;
use std::fmt;

/// Acceptance thresholds for enrollment frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Maximum absolute yaw, in degrees.
    pub max_yaw: f32,
    /// Maximum absolute pitch, in degrees.
    pub max_pitch: f32,
    /// Maximum absolute roll, in degrees.
    pub max_roll: f32,
    /// Accept faces with an occluded forehead, eyes, or mouth.
    pub allow_occlusion: bool,
    /// Head wear or mask detected above this confidence rejects the frame.
    pub max_accessory_confidence: f32,
    /// Glasses types that reject the frame.
    pub rejected_glasses: Vec<GlassesType>,
    /// Maximum blur score.
    pub max_blur: f32,
    /// Lowest acceptable exposure score.
    pub min_exposure: f32,
    /// Highest acceptable exposure score.
    pub max_exposure: f32,
    /// Maximum noise score.
    pub max_noise: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_yaw: 20.0,
            max_pitch: 20.0,
            max_roll: 20.0,
            allow_occlusion: false,
            max_accessory_confidence: 0.5,
            rejected_glasses: vec![GlassesType::Sunglasses, GlassesType::SwimmingGoggles],
            max_blur: 0.5,
            min_exposure: 0.25,
            max_exposure: 0.75,
            max_noise: 0.5,
        }
    }
}

/// A single reason a frame was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityIssue {
    /// Exactly one face is required.
    FaceCount(usize),
    /// An attribute some threshold depends on was not returned.
    MissingAttributes,
    Yaw(f32),
    Pitch(f32),
    Roll(f32),
    Occluded,
    Glasses(GlassesType),
    Accessory {
        kind: AccessoryKind,
        confidence: f32,
    },
    Blur(f32),
    Exposure(f32),
    Noise(f32),
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::FaceCount(n) => write!(f, "expected one face, found {n}"),
            QualityIssue::MissingAttributes => f.write_str("missing face attributes"),
            QualityIssue::Yaw(v) => write!(f, "yaw {v:.1}°"),
            QualityIssue::Pitch(v) => write!(f, "pitch {v:.1}°"),
            QualityIssue::Roll(v) => write!(f, "roll {v:.1}°"),
            QualityIssue::Occluded => f.write_str("face occluded"),
            QualityIssue::Glasses(g) => write!(f, "glasses {g:?}"),
            QualityIssue::Accessory { kind, confidence } => {
                write!(f, "accessory {kind:?} ({confidence:.2})")
            }
            QualityIssue::Blur(v) => write!(f, "blur {v:.2}"),
            QualityIssue::Exposure(v) => write!(f, "exposure {v:.2}"),
            QualityIssue::Noise(v) => write!(f, "noise {v:.2}"),
        }
    }
}

/// Result of evaluating one frame's detections.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameQualityReport {
    pub face_count: usize,
    pub issues: Vec<QualityIssue>,
}

impl FrameQualityReport {
    pub fn is_acceptable(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for FrameQualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return f.write_str("acceptable");
        }
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Applies [`QualityThresholds`] to detection results.
#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    thresholds: QualityThresholds,
}

impl QualityFilter {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    pub fn accepts(&self, faces: &[DetectedFace]) -> bool {
        self.evaluate(faces).is_acceptable()
    }

    /// Collect every reason the detections fail the thresholds.
    pub fn evaluate(&self, faces: &[DetectedFace]) -> FrameQualityReport {
        let face_count = faces.len();
        let [face] = faces else {
            return FrameQualityReport {
                face_count,
                issues: vec![QualityIssue::FaceCount(face_count)],
            };
        };

        let Some(attrs) = face.face_attributes.as_ref() else {
            return FrameQualityReport {
                face_count,
                issues: vec![QualityIssue::MissingAttributes],
            };
        };

        let t = &self.thresholds;
        let mut issues = Vec::new();

        let missing = attrs.head_pose.is_none()
            || (!t.allow_occlusion && attrs.occlusion.is_none())
            || (!t.rejected_glasses.is_empty() && attrs.glasses.is_none())
            || attrs.accessories.is_none()
            || attrs.blur.is_none()
            || attrs.exposure.is_none()
            || attrs.noise.is_none();
        if missing {
            issues.push(QualityIssue::MissingAttributes);
        }

        if let Some(pose) = attrs.head_pose {
            if pose.yaw.abs() > t.max_yaw {
                issues.push(QualityIssue::Yaw(pose.yaw));
            }
            if pose.pitch.abs() > t.max_pitch {
                issues.push(QualityIssue::Pitch(pose.pitch));
            }
            if pose.roll.abs() > t.max_roll {
                issues.push(QualityIssue::Roll(pose.roll));
            }
        }

        if !t.allow_occlusion && attrs.occlusion.is_some_and(|o| o.any()) {
            issues.push(QualityIssue::Occluded);
        }

        if let Some(glasses) = attrs.glasses {
            if t.rejected_glasses.contains(&glasses) {
                issues.push(QualityIssue::Glasses(glasses));
            }
        }

        for accessory in attrs.accessories.iter().flatten() {
            let covers_face =
                matches!(accessory.kind, AccessoryKind::HeadWear | AccessoryKind::Mask);
            if covers_face && accessory.confidence > t.max_accessory_confidence {
                issues.push(QualityIssue::Accessory {
                    kind: accessory.kind,
                    confidence: accessory.confidence,
                });
            }
        }

        if let Some(blur) = attrs.blur {
            if blur.value > t.max_blur {
                issues.push(QualityIssue::Blur(blur.value));
            }
        }

        if let Some(exposure) = attrs.exposure {
            if exposure.value < t.min_exposure || exposure.value > t.max_exposure {
                issues.push(QualityIssue::Exposure(exposure.value));
            }
        }

        if let Some(noise) = attrs.noise {
            if noise.value > t.max_noise {
                issues.push(QualityIssue::Noise(noise.value));
            }
        }

        FrameQualityReport { face_count, issues }
    }
}
