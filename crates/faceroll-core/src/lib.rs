//! faceroll-core — Face enrollment workflow.
//!
//! Drives the capture → filter → enroll → verify → train sequence against a
//! remote face service, bounded by a cooperative deadline and followed by a
//! compensating delete when verification never succeeds.

pub mod cancel;
pub mod quality;
pub mod record;
pub mod service;
pub mod session;
pub mod settings;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancellationToken;
pub use quality::{FrameQualityReport, QualityFilter, QualityIssue, QualityThresholds};
pub use record::EnrollmentRecord;
pub use service::{FaceService, FrameCapture, ProgressObserver};
pub use session::{EnrollError, EnrollPhase, EnrollmentSession};
pub use settings::EnrollSettings;
pub use types::{
    AddFaceOutcome, DetectedFace, EnrollResult, FaceAttributes, FaceRectangle, PersonIdentity,
    VerifyOutcome,
};
