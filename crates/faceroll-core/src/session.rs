//! Enrollment orchestrator.
//!
//! One session stores frames for a freshly created person until the target
//! count is reached, keeps capturing until one frame verifies against that
//! person, then triggers group training. A deadline timer and the user share
//! the session's [`CancellationToken`]; both loops observe it only between
//! iterations, so cancellation latency is one capture plus one service call.
//!
//! ```text
//! Idle → Enrolling → Verifying → Training → Finished(Success | SuccessNoTrain)
//!             └──────────┴─ cancel / deadline ─→ Finished(Cancel | Timeout | Error)
//! ```

use crate::cancel::CancellationToken;
use crate::quality::{FrameQualityReport, QualityFilter};
use crate::service::{FaceService, FrameCapture, ProgressObserver};
use crate::settings::EnrollSettings;
use crate::types::{AddFaceOutcome, EnrollResult, PersonIdentity};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("capture returned no frame")]
    CaptureEmpty,
    #[error("frame rejected by quality filter: {0}")]
    QualityRejected(FrameQualityReport),
    #[error("frame rejected by face service: {0}")]
    FrameRejected(String),
    #[error("face service error: {0}")]
    Service(#[source] BoxError),
    #[error("compensating delete failed: {0}")]
    CompensationFailed(#[source] BoxError),
    #[error("enrollment session already started")]
    SessionAlreadyRunning,
}

impl EnrollError {
    fn service<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        EnrollError::Service(Box::new(err))
    }
}

/// Where a session currently is. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollPhase {
    Idle,
    Enrolling,
    Verifying,
    Training,
    Finished(EnrollResult),
}

/// Deadline timer for one session. Dropping it disarms the timer.
struct DeadlineTimer {
    handle: JoinHandle<()>,
}

impl DeadlineTimer {
    fn arm(token: CancellationToken, timeout: Duration) -> Self {
        let handle = tokio::spawn(
            async move {
                tokio::time::sleep(timeout).await;
                if token.timeout_cancel() {
                    tracing::info!(
                        timeout_ms = timeout.as_millis() as u64,
                        "enrollment deadline elapsed"
                    );
                }
            }
            .in_current_span(),
        );
        Self { handle }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A single enroll → verify → train run for one person.
///
/// A session runs at most once; later start requests are ignored.
pub struct EnrollmentSession<S> {
    service: Arc<S>,
    person: PersonIdentity,
    settings: EnrollSettings,
    filter: QualityFilter,
    token: CancellationToken,
    started: AtomicBool,
    frames: AtomicU32,
    progress: Box<dyn ProgressObserver>,
    phase: watch::Sender<EnrollPhase>,
}

impl<S: FaceService + 'static> EnrollmentSession<S> {
    pub fn new(service: Arc<S>, person: PersonIdentity, settings: EnrollSettings) -> Self {
        let (phase, _) = watch::channel(EnrollPhase::Idle);
        Self {
            service,
            person,
            filter: QualityFilter::new(settings.quality.clone()),
            settings,
            token: CancellationToken::new(),
            started: AtomicBool::new(false),
            frames: AtomicU32::new(0),
            progress: Box::new(|_: u32| {}),
            phase,
        }
    }

    /// Report every enrolled or verified frame to `observer`.
    pub fn with_progress(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.progress = Box::new(observer);
        self
    }

    pub fn person(&self) -> &PersonIdentity {
        &self.person
    }

    /// Handle for cancelling this session from elsewhere (UI, signal handler).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        if self.token.cancel() {
            tracing::info!(person = %self.person.person_id, "enrollment cancel requested");
        }
    }

    /// Enrolled plus verified frames so far.
    pub fn frames_processed(&self) -> u32 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> EnrollPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EnrollPhase> {
        self.phase.subscribe()
    }

    /// Run the session on the current task.
    ///
    /// Fails only with [`EnrollError::SessionAlreadyRunning`]; every other
    /// outcome is reported through the returned [`EnrollResult`].
    pub async fn run<C: FrameCapture>(&self, capture: &mut C) -> Result<EnrollResult, EnrollError> {
        self.claim()?;
        Ok(self.drive(capture).await)
    }

    /// Run the session on a spawned task and hand the result to `on_completed`.
    pub fn start<C, F>(
        self: &Arc<Self>,
        mut capture: C,
        on_completed: F,
    ) -> Result<JoinHandle<()>, EnrollError>
    where
        C: FrameCapture + 'static,
        F: FnOnce(EnrollResult) + Send + 'static,
    {
        self.claim()?;
        let session = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let result = session.drive(&mut capture).await;
            on_completed(result);
        }))
    }

    fn claim(&self) -> Result<(), EnrollError> {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(person = %self.person.person_id, "enrollment already started; ignoring");
            return Err(EnrollError::SessionAlreadyRunning);
        }
        Ok(())
    }

    async fn drive<C: FrameCapture>(&self, capture: &mut C) -> EnrollResult {
        let span = tracing::info_span!(
            "enroll",
            session = %Uuid::new_v4(),
            group = %self.person.group_id,
            person = %self.person.person_id,
        );
        let result = self.execute(capture).instrument(span).await;
        self.phase.send_replace(EnrollPhase::Finished(result));
        tracing::info!(%result, code = result.code(), "enrollment finished");
        result
    }

    async fn execute<C: FrameCapture>(&self, capture: &mut C) -> EnrollResult {
        self.phase.send_replace(EnrollPhase::Enrolling);
        tokio::time::sleep(self.settings.settle_delay()).await;

        let verified = {
            let _deadline = DeadlineTimer::arm(self.token.clone(), self.settings.timeout());
            self.enroll_frames(capture).await;
            self.verify_frames(capture).await
        };

        if !verified {
            return self.compensate().await;
        }

        self.phase.send_replace(EnrollPhase::Training);
        match self.service.train(&self.person.group_id).await {
            Ok(true) => EnrollResult::Success,
            Ok(false) => {
                tracing::warn!("training trigger refused");
                EnrollResult::SuccessNoTrain
            }
            Err(err) => {
                tracing::warn!(error = %err, "training trigger failed");
                EnrollResult::SuccessNoTrain
            }
        }
    }

    async fn enroll_frames<C: FrameCapture>(&self, capture: &mut C) {
        let target = self.settings.target_enroll_frames;
        let mut enrolled = 0u32;
        let mut attempt = 0u32;

        while enrolled < target && !self.token.is_cancellation_requested() {
            attempt += 1;
            match self.enroll_frame(capture).await {
                Ok(()) => {
                    enrolled += 1;
                    let frames = self.advance();
                    tracing::info!(enrolled, target, attempt, frames, "frame enrolled");
                }
                Err(err) => {
                    skipped(attempt, &err);
                    self.backoff().await;
                }
            }
        }
    }

    async fn enroll_frame<C: FrameCapture>(&self, capture: &mut C) -> Result<(), EnrollError> {
        let frame = capture.take_picture().await.ok_or(EnrollError::CaptureEmpty)?;

        let faces = self
            .service
            .detect(&frame, true)
            .await
            .map_err(EnrollError::service)?;

        let report = self.filter.evaluate(&faces);
        let [face] = faces.as_slice() else {
            return Err(EnrollError::QualityRejected(report));
        };
        if !report.is_acceptable() {
            return Err(EnrollError::QualityRejected(report));
        }

        match self
            .service
            .add_face(&self.person, &frame, &face.face_rectangle)
            .await
            .map_err(EnrollError::service)?
        {
            AddFaceOutcome::Persisted { persisted_face_id } => {
                tracing::debug!(%persisted_face_id, "face persisted");
                Ok(())
            }
            AddFaceOutcome::Rejected { reason } => Err(EnrollError::FrameRejected(reason)),
        }
    }

    async fn verify_frames<C: FrameCapture>(&self, capture: &mut C) -> bool {
        let mut attempt = 0u32;

        while !self.token.is_cancellation_requested() {
            if self.settings.max_verify_attempts.is_some_and(|max| attempt >= max) {
                tracing::warn!(attempts = attempt, "verify attempts exhausted");
                return false;
            }
            if attempt == 0 {
                self.phase.send_replace(EnrollPhase::Verifying);
            }
            attempt += 1;

            match self.verify_frame(capture).await {
                Ok(true) => {
                    let frames = self.advance();
                    tracing::info!(attempt, frames, "enrollment verified");
                    return true;
                }
                Ok(false) => {
                    tracing::debug!(attempt, "frame did not verify");
                    self.backoff().await;
                }
                Err(err) => {
                    skipped(attempt, &err);
                    self.backoff().await;
                }
            }
        }
        false
    }

    async fn verify_frame<C: FrameCapture>(&self, capture: &mut C) -> Result<bool, EnrollError> {
        let frame = capture.take_picture().await.ok_or(EnrollError::CaptureEmpty)?;
        let outcome = self
            .service
            .verify(&self.person, &frame)
            .await
            .map_err(EnrollError::service)?;
        tracing::debug!(
            is_identical = outcome.is_identical,
            confidence = outcome.confidence,
            "verify response"
        );
        Ok(outcome.is_identical)
    }

    /// Delete the partially enrolled person and classify the failure.
    ///
    /// The delete is best effort: its outcome is logged and never changes
    /// the returned result.
    async fn compensate(&self) -> EnrollResult {
        tracing::warn!("verification did not succeed; deleting partial enrollment");
        match self.service.delete_person(&self.person).await {
            Ok(true) => tracing::info!("partial enrollment deleted"),
            Ok(false) => tracing::info!("partial enrollment already absent"),
            Err(err) => {
                let err = EnrollError::CompensationFailed(Box::new(err));
                tracing::warn!(error = %err, "leaving partial enrollment behind");
            }
        }

        if self.token.is_timeout_cancellation() {
            EnrollResult::Timeout
        } else if self.token.is_cancellation_requested() {
            EnrollResult::Cancel
        } else {
            tracing::warn!("verification stopped without success or cancellation");
            EnrollResult::Error
        }
    }

    fn advance(&self) -> u32 {
        let frames = self.frames.fetch_add(1, Ordering::AcqRel) + 1;
        self.progress.on_progress(frames);
        frames
    }

    async fn backoff(&self) {
        let pause = self.settings.retry_backoff();
        if pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(pause).await;
        }
    }
}

fn skipped(attempt: u32, err: &EnrollError) {
    match err {
        EnrollError::Service(_) => tracing::warn!(attempt, error = %err, "iteration failed"),
        _ => tracing::debug!(attempt, reason = %err, "iteration skipped"),
    }
}
