//! JSON bodies exchanged with the face service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePersonRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePersonResponse {
    pub person_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateGroupRequest<'a> {
    pub name: &'a str,
    pub recognition_model: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedFaceResponse {
    pub persisted_face_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyRequest<'a> {
    pub face_id: &'a str,
    pub person_id: &'a str,
    pub large_person_group_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyResponse {
    pub is_identical: bool,
    pub confidence: f32,
}

/// Error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Option<ErrorDetail> {
        serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error)
    }
}

/// Human-readable message from an error response, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    match ErrorBody::parse(body) {
        Some(detail) if !detail.code.is_empty() => format!("{}: {}", detail.code, detail.message),
        Some(detail) => detail.message,
        None => body.trim().to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// Training status of a large person group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStatus {
    pub status: TrainingState,
    #[serde(default)]
    pub created_date_time: Option<String>,
    #[serde(default)]
    pub last_action_date_time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
