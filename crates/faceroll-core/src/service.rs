//! Collaborator seams of the enrollment workflow.

use crate::types::{AddFaceOutcome, DetectedFace, FaceRectangle, PersonIdentity, VerifyOutcome};
use async_trait::async_trait;

/// Remote face service: person management, detection, enrollment, verification.
///
/// Implementations make exactly one request/response exchange per call and
/// never retry; retrying is the orchestrator's decision.
#[async_trait]
pub trait FaceService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a person in `group_id`, returning the service-assigned person id.
    async fn create_person(&self, group_id: &str, name: &str) -> Result<String, Self::Error>;

    /// Detect faces in an encoded frame, optionally with quality attributes.
    async fn detect(
        &self,
        frame: &[u8],
        with_attributes: bool,
    ) -> Result<Vec<DetectedFace>, Self::Error>;

    /// Store the face at `target` in `frame` against `person`.
    async fn add_face(
        &self,
        person: &PersonIdentity,
        frame: &[u8],
        target: &FaceRectangle,
    ) -> Result<AddFaceOutcome, Self::Error>;

    /// Check whether the face in `frame` belongs to `person`.
    async fn verify(
        &self,
        person: &PersonIdentity,
        frame: &[u8],
    ) -> Result<VerifyOutcome, Self::Error>;

    /// Trigger training of `group_id`. `Ok(false)` means the trigger was refused.
    async fn train(&self, group_id: &str) -> Result<bool, Self::Error>;

    /// Delete `person`. `Ok(false)` means the service no longer knew the person.
    async fn delete_person(&self, person: &PersonIdentity) -> Result<bool, Self::Error>;
}

/// Source of camera frames.
#[async_trait]
pub trait FrameCapture: Send {
    /// Capture one encoded frame, or `None` when nothing usable was captured.
    async fn take_picture(&mut self) -> Option<Vec<u8>>;
}

/// Receives the running count of enrolled plus verified frames.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, frames: u32);
}

impl<F> ProgressObserver for F
where
    F: Fn(u32) + Send + Sync,
{
    fn on_progress(&self, frames: u32) {
        self(frames)
    }
}
