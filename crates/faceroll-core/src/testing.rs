//! In-memory fakes shared by the unit tests.

use crate::cancel::CancellationToken;
use crate::service::{FaceService, FrameCapture};
use crate::types::{
    AddFaceOutcome, Blur, DetectedFace, Exposure, FaceAttributes, FaceRectangle, GlassesType,
    HeadPose, Noise, Occlusion, PersonIdentity, VerifyOutcome,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A frontal, sharp, well-exposed single face.
pub(crate) fn good_face() -> DetectedFace {
    DetectedFace {
        face_id: Some("face-1".into()),
        face_rectangle: FaceRectangle {
            top: 40,
            left: 60,
            width: 120,
            height: 120,
        },
        face_attributes: Some(FaceAttributes {
            head_pose: Some(HeadPose {
                pitch: 1.5,
                roll: -2.0,
                yaw: 4.0,
            }),
            occlusion: Some(Occlusion::default()),
            glasses: Some(GlassesType::NoGlasses),
            accessories: Some(Vec::new()),
            blur: Some(Blur {
                blur_level: None,
                value: 0.1,
            }),
            exposure: Some(Exposure {
                exposure_level: None,
                value: 0.5,
            }),
            noise: Some(Noise {
                noise_level: None,
                value: 0.1,
            }),
        }),
    }
}

pub(crate) fn two_faces() -> Vec<DetectedFace> {
    vec![good_face(), good_face()]
}

#[derive(Debug, thiserror::Error)]
#[error("fake service failure: {0}")]
pub(crate) struct FakeError(pub &'static str);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Calls {
    pub create: usize,
    pub detect: usize,
    pub add_face: usize,
    pub verify: usize,
    pub train: usize,
    pub delete: usize,
}

/// Scripted responses. Empty queues fall back to the happy path.
pub(crate) struct FakeState {
    pub create_failure: Option<&'static str>,
    pub detect: VecDeque<Result<Vec<DetectedFace>, &'static str>>,
    pub add_face: VecDeque<AddFaceOutcome>,
    pub verify: VecDeque<Result<bool, &'static str>>,
    pub verify_default: bool,
    pub train: Result<bool, &'static str>,
    pub delete: Result<bool, &'static str>,
    pub deleted: Vec<String>,
    pub calls: Calls,
    next_person: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            create_failure: None,
            detect: VecDeque::new(),
            add_face: VecDeque::new(),
            verify: VecDeque::new(),
            verify_default: true,
            train: Ok(true),
            delete: Ok(true),
            deleted: Vec::new(),
            calls: Calls::default(),
            next_person: 0,
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl FaceService for FakeService {
    type Error = FakeError;

    async fn create_person(&self, _group_id: &str, _name: &str) -> Result<String, FakeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create += 1;
        if let Some(reason) = state.create_failure {
            return Err(FakeError(reason));
        }
        state.next_person += 1;
        Ok(format!("person-{}", state.next_person))
    }

    async fn detect(
        &self,
        _frame: &[u8],
        _with_attributes: bool,
    ) -> Result<Vec<DetectedFace>, FakeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.detect += 1;
        match state.detect.pop_front() {
            Some(scripted) => scripted.map_err(FakeError),
            None => Ok(vec![good_face()]),
        }
    }

    async fn add_face(
        &self,
        _person: &PersonIdentity,
        _frame: &[u8],
        _target: &FaceRectangle,
    ) -> Result<AddFaceOutcome, FakeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.add_face += 1;
        let n = state.calls.add_face;
        Ok(state
            .add_face
            .pop_front()
            .unwrap_or_else(|| AddFaceOutcome::Persisted {
                persisted_face_id: format!("persisted-{n}"),
            }))
    }

    async fn verify(
        &self,
        _person: &PersonIdentity,
        _frame: &[u8],
    ) -> Result<VerifyOutcome, FakeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.verify += 1;
        let default = state.verify_default;
        let is_identical = state
            .verify
            .pop_front()
            .unwrap_or(Ok(default))
            .map_err(FakeError)?;
        Ok(VerifyOutcome {
            is_identical,
            confidence: if is_identical { 0.9 } else { 0.1 },
        })
    }

    async fn train(&self, _group_id: &str) -> Result<bool, FakeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.train += 1;
        state.train.map_err(FakeError)
    }

    async fn delete_person(&self, person: &PersonIdentity) -> Result<bool, FakeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;
        let deleted = state.delete.map_err(FakeError)?;
        if deleted {
            state.deleted.push(person.person_id.clone());
        }
        Ok(deleted)
    }
}

/// Capture provider that replays a script, then repeats a fallback.
pub(crate) struct ScriptedCapture {
    script: VecDeque<Option<Vec<u8>>>,
    fallback: Option<Vec<u8>>,
    attempts: Arc<AtomicUsize>,
    cancel_at: Option<(usize, CancellationToken)>,
}

impl ScriptedCapture {
    /// Every capture yields a frame.
    pub fn frames() -> Self {
        Self::script(Vec::new())
    }

    /// Every capture comes back empty.
    pub fn empty() -> Self {
        Self {
            fallback: None,
            ..Self::frames()
        }
    }

    /// Replay `script`, then yield frames.
    pub fn script(script: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
            fallback: Some(b"jpeg".to_vec()),
            attempts: Arc::new(AtomicUsize::new(0)),
            cancel_at: None,
        }
    }

    /// Cancel `token` while serving capture number `attempt` (1-based).
    pub fn cancel_at(mut self, attempt: usize, token: CancellationToken) -> Self {
        self.cancel_at = Some((attempt, token));
        self
    }

    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl FrameCapture for ScriptedCapture {
    async fn take_picture(&mut self) -> Option<Vec<u8>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_at {
            if *at == attempt {
                token.cancel();
            }
        }
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
