use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal outcome of one enrollment session.
///
/// Numeric codes are stable and used as process exit codes by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrollResult {
    /// Verified and group training was triggered.
    Success,
    /// Verified, but the training trigger failed.
    SuccessNoTrain,
    /// The user cancelled before verification succeeded.
    Cancel,
    /// The session deadline elapsed before verification succeeded.
    Timeout,
    /// Verification ended without success or cancellation.
    Error,
}

impl EnrollResult {
    pub fn code(self) -> u8 {
        match self {
            EnrollResult::Success => 0,
            EnrollResult::SuccessNoTrain => 1,
            EnrollResult::Cancel => 2,
            EnrollResult::Timeout => 3,
            EnrollResult::Error => 4,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, EnrollResult::Success | EnrollResult::SuccessNoTrain)
    }
}

impl fmt::Display for EnrollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrollResult::Success => "success",
            EnrollResult::SuccessNoTrain => "success (training not triggered)",
            EnrollResult::Cancel => "cancelled",
            EnrollResult::Timeout => "timed out",
            EnrollResult::Error => "error",
        };
        f.write_str(name)
    }
}

/// A person in a large person group, as assigned by the face service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonIdentity {
    pub group_id: String,
    pub person_id: String,
}

impl PersonIdentity {
    pub fn new(group_id: impl Into<String>, person_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            person_id: person_id.into(),
        }
    }
}

/// Pixel rectangle of a detected face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRectangle {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRectangle {
    /// `left,top,width,height` — the form the service expects for `targetFace`.
    pub fn target_face(&self) -> String {
        format!("{},{},{},{}", self.left, self.top, self.width, self.height)
    }
}

/// One face returned by the service's detect operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    #[serde(default)]
    pub face_id: Option<String>,
    pub face_rectangle: FaceRectangle,
    #[serde(default)]
    pub face_attributes: Option<FaceAttributes>,
}

/// Face-detection attributes evaluated by the quality filter.
///
/// Every field is optional because the service only returns the
/// attributes that were requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAttributes {
    #[serde(default)]
    pub head_pose: Option<HeadPose>,
    #[serde(default)]
    pub occlusion: Option<Occlusion>,
    #[serde(default)]
    pub glasses: Option<GlassesType>,
    #[serde(default)]
    pub accessories: Option<Vec<Accessory>>,
    #[serde(default)]
    pub blur: Option<Blur>,
    #[serde(default)]
    pub exposure: Option<Exposure>,
    #[serde(default)]
    pub noise: Option<Noise>,
}

/// Head pose angles in degrees; all zero means frontal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occlusion {
    pub forehead_occluded: bool,
    pub eye_occluded: bool,
    pub mouth_occluded: bool,
}

impl Occlusion {
    pub fn any(&self) -> bool {
        self.forehead_occluded || self.eye_occluded || self.mouth_occluded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlassesType {
    NoGlasses,
    ReadingGlasses,
    Sunglasses,
    SwimmingGoggles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessoryKind {
    HeadWear,
    Glasses,
    Mask,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accessory {
    #[serde(rename = "type")]
    pub kind: AccessoryKind,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExposureLevel {
    UnderExposure,
    GoodExposure,
    OverExposure,
}

/// Blur score in [0, 1]; higher is blurrier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blur {
    #[serde(default)]
    pub blur_level: Option<Level>,
    pub value: f32,
}

/// Exposure score in [0, 1]; around 0.5 is well exposed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exposure {
    #[serde(default)]
    pub exposure_level: Option<ExposureLevel>,
    pub value: f32,
}

/// Noise score in [0, 1]; higher is noisier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Noise {
    #[serde(default)]
    pub noise_level: Option<Level>,
    pub value: f32,
}

/// Outcome of submitting one frame for enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddFaceOutcome {
    /// The face was stored against the person.
    Persisted { persisted_face_id: String },
    /// The service refused the frame (no face at target, bad image, ...).
    Rejected { reason: String },
}

/// Outcome of verifying one frame against an enrolled person.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerifyOutcome {
    pub is_identical: bool,
    pub confidence: f32,
}

impl VerifyOutcome {
    /// Non-match used when a frame could not be turned into a single face.
    pub fn no_match() -> Self {
        Self {
            is_identical: false,
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETECT_RESPONSE: &str = r#"[{
        "faceId": "c5c24a82-6845-4031-9d5d-978df9175426",
        "recognitionModel": "recognition_03",
        "faceRectangle": {"width": 78, "height": 80, "left": 394, "top": 54},
        "faceAttributes": {
            "headPose": {"roll": -2.3, "yaw": 4.1, "pitch": 0.0},
            "glasses": "NoGlasses",
            "occlusion": {"foreheadOccluded": false, "eyeOccluded": false, "mouthOccluded": true},
            "accessories": [
                {"type": "headWear", "confidence": 0.99},
                {"type": "earring", "confidence": 0.4}
            ],
            "blur": {"blurLevel": "medium", "value": 0.51},
            "exposure": {"exposureLevel": "goodExposure", "value": 0.55},
            "noise": {"noiseLevel": "low", "value": 0.12}
        }
    }]"#;

    #[test]
    fn test_detect_response_parses() {
        let faces: Vec<DetectedFace> = serde_json::from_str(DETECT_RESPONSE).unwrap();
        assert_eq!(faces.len(), 1);

        let face = &faces[0];
        assert_eq!(face.face_id.as_deref(), Some("c5c24a82-6845-4031-9d5d-978df9175426"));
        assert_eq!(face.face_rectangle.left, 394);
        assert_eq!(face.face_rectangle.height, 80);

        let attrs = face.face_attributes.as_ref().unwrap();
        assert_eq!(attrs.glasses, Some(GlassesType::NoGlasses));
        assert!(attrs.occlusion.unwrap().mouth_occluded);
        assert!(attrs.occlusion.unwrap().any());
        assert_eq!(attrs.blur.unwrap().blur_level, Some(Level::Medium));
        assert_eq!(
            attrs.exposure.unwrap().exposure_level,
            Some(ExposureLevel::GoodExposure)
        );

        let accessories = attrs.accessories.as_ref().unwrap();
        assert_eq!(accessories[0].kind, AccessoryKind::HeadWear);
        assert_eq!(accessories[1].kind, AccessoryKind::Other);
    }

    #[test]
    fn test_detect_response_without_attributes() {
        let json = r#"[{"faceId": "abc", "faceRectangle": {"width": 1, "height": 2, "left": 3, "top": 4}}]"#;
        let faces: Vec<DetectedFace> = serde_json::from_str(json).unwrap();
        assert!(faces[0].face_attributes.is_none());
    }

    #[test]
    fn test_target_face_order() {
        let rect = FaceRectangle {
            top: 54,
            left: 394,
            width: 78,
            height: 80,
        };
        assert_eq!(rect.target_face(), "394,54,78,80");
    }

    #[test]
    fn test_enroll_result_codes() {
        assert_eq!(EnrollResult::Success.code(), 0);
        assert_eq!(EnrollResult::SuccessNoTrain.code(), 1);
        assert_eq!(EnrollResult::Cancel.code(), 2);
        assert_eq!(EnrollResult::Timeout.code(), 3);
        assert_eq!(EnrollResult::Error.code(), 4);
        assert!(EnrollResult::SuccessNoTrain.is_success());
        assert!(!EnrollResult::Timeout.is_success());
    }
}
