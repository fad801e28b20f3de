//! HTTP client for the face service.
//!
//! Every call is a single request/response exchange; nothing is retried here.
//! Status handling lives in small pure functions so it can be checked
//! without a network.

use crate::config::ServiceConfig;
use crate::endpoints;
use crate::wire::{
    error_message, CreateGroupRequest, CreatePersonRequest, CreatePersonResponse, ErrorBody,
    PersistedFaceResponse, TrainingStatus, VerifyRequest, VerifyResponse,
};
use async_trait::async_trait;
use faceroll_core::{
    AddFaceOutcome, DetectedFace, FaceRectangle, FaceService, PersonIdentity, VerifyOutcome,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use thiserror::Error;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const PERSON_NOT_FOUND: &str = "Person is not found.";

#[derive(Debug, Error)]
pub enum FaceApiError {
    #[error("face service endpoint not configured")]
    MissingEndpoint,
    #[error("face service subscription key not configured")]
    MissingKey,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected status: {status} ({message})")]
    UnexpectedStatus {
        status: StatusCode,
        message: String,
    },
}

/// Whether [`FaceApiClient::validate_person_group`] found or created the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Existing,
    Created,
}

/// Clone-safe client; clones share the connection pool.
#[derive(Clone)]
pub struct FaceApiClient {
    http: Client,
    config: ServiceConfig,
}

impl FaceApiClient {
    pub fn new(config: ServiceConfig) -> Result<Self, FaceApiError> {
        if config.endpoint.trim().is_empty() {
            return Err(FaceApiError::MissingEndpoint);
        }
        if config.subscription_key.trim().is_empty() {
            return Err(FaceApiError::MissingKey);
        }

        let http = Client::builder().user_agent(config.user_agent()).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Make sure `group_id` exists, creating it with the configured
    /// recognition model when the service reports it missing.
    pub async fn validate_person_group(&self, group_id: &str) -> Result<GroupStatus, FaceApiError> {
        let path = endpoints::person_group(group_id);
        let res = self.request(Method::GET, &path).send().await?;

        match res.status() {
            StatusCode::OK => Ok(GroupStatus::Existing),
            StatusCode::NOT_FOUND => {
                tracing::info!(group = group_id, "person group not found; creating");
                let res = self
                    .request(Method::PUT, &path)
                    .json(&CreateGroupRequest {
                        name: group_id,
                        recognition_model: &self.config.recognition_model,
                    })
                    .send()
                    .await?;
                expect_ok(res).await?;
                Ok(GroupStatus::Created)
            }
            status => Err(unexpected(status, res).await),
        }
    }

    pub async fn training_status(&self, group_id: &str) -> Result<TrainingStatus, FaceApiError> {
        let res = self
            .request(Method::GET, &endpoints::training_status(group_id))
            .send()
            .await?;
        Ok(expect_ok(res).await?.json().await?)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, endpoints::url(&self.config.endpoint, path))
            .header(ACCEPT, "application/json")
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.subscription_key)
    }
}

#[async_trait]
impl FaceService for FaceApiClient {
    type Error = FaceApiError;

    async fn create_person(&self, group_id: &str, name: &str) -> Result<String, FaceApiError> {
        let res = self
            .request(Method::POST, &endpoints::persons(group_id))
            .json(&CreatePersonRequest { name })
            .send()
            .await?;
        let body: CreatePersonResponse = expect_ok(res).await?.json().await?;
        tracing::debug!(group = group_id, person = %body.person_id, "create person");
        Ok(body.person_id)
    }

    async fn detect(
        &self,
        frame: &[u8],
        with_attributes: bool,
    ) -> Result<Vec<DetectedFace>, FaceApiError> {
        let mut query = vec![
            ("returnFaceId", "true"),
            ("recognitionModel", self.config.recognition_model.as_str()),
            ("detectionModel", self.config.detection_model.as_str()),
        ];
        if with_attributes {
            query.push(("returnFaceAttributes", endpoints::FACE_ATTRIBUTES));
        }

        let res = self
            .request(Method::POST, &endpoints::detect())
            .query(&query)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(frame.to_vec())
            .send()
            .await?;
        let faces: Vec<DetectedFace> = expect_ok(res).await?.json().await?;
        tracing::debug!(faces = faces.len(), with_attributes, "detect");
        Ok(faces)
    }

    async fn add_face(
        &self,
        person: &PersonIdentity,
        frame: &[u8],
        target: &FaceRectangle,
    ) -> Result<AddFaceOutcome, FaceApiError> {
        let res = self
            .request(
                Method::POST,
                &endpoints::persisted_faces(&person.group_id, &person.person_id),
            )
            .query(&[
                ("targetFace", target.target_face()),
                ("detectionModel", self.config.detection_model.clone()),
            ])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(frame.to_vec())
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        add_face_outcome(status, &body)
    }

    async fn verify(
        &self,
        person: &PersonIdentity,
        frame: &[u8],
    ) -> Result<VerifyOutcome, FaceApiError> {
        let faces = self.detect(frame, false).await?;
        let face_id = match faces.as_slice() {
            [face] => face.face_id.as_deref(),
            _ => None,
        };
        let Some(face_id) = face_id else {
            tracing::debug!(faces = faces.len(), "verify frame needs exactly one face");
            return Ok(VerifyOutcome::no_match());
        };

        let res = self
            .request(Method::POST, &endpoints::verify())
            .json(&VerifyRequest {
                face_id,
                person_id: &person.person_id,
                large_person_group_id: &person.group_id,
            })
            .send()
            .await?;
        let body: VerifyResponse = expect_ok(res).await?.json().await?;
        Ok(VerifyOutcome {
            is_identical: body.is_identical,
            confidence: body.confidence,
        })
    }

    async fn train(&self, group_id: &str) -> Result<bool, FaceApiError> {
        let res = self
            .request(Method::POST, &endpoints::train(group_id))
            .send()
            .await?;
        let status = res.status();
        if train_triggered(status) {
            tracing::info!(group = group_id, "training triggered");
            return Ok(true);
        }
        let body = res.text().await.unwrap_or_default();
        tracing::warn!(group = group_id, %status, message = %error_message(&body), "training not triggered");
        Ok(false)
    }

    async fn delete_person(&self, person: &PersonIdentity) -> Result<bool, FaceApiError> {
        let res = self
            .request(
                Method::DELETE,
                &endpoints::person(&person.group_id, &person.person_id),
            )
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        delete_outcome(status, &body)
    }
}

async fn expect_ok(res: Response) -> Result<Response, FaceApiError> {
    if res.status() == StatusCode::OK {
        return Ok(res);
    }
    let status = res.status();
    Err(unexpected(status, res).await)
}

async fn unexpected(status: StatusCode, res: Response) -> FaceApiError {
    let body = res.text().await.unwrap_or_default();
    FaceApiError::UnexpectedStatus {
        status,
        message: error_message(&body),
    }
}

/// 200 stores the face; 400 is the service refusing this frame.
fn add_face_outcome(status: StatusCode, body: &str) -> Result<AddFaceOutcome, FaceApiError> {
    match status {
        StatusCode::OK => {
            let persisted: PersistedFaceResponse = serde_json::from_str(body)?;
            Ok(AddFaceOutcome::Persisted {
                persisted_face_id: persisted.persisted_face_id,
            })
        }
        StatusCode::BAD_REQUEST => Ok(AddFaceOutcome::Rejected {
            reason: error_message(body),
        }),
        status => Err(FaceApiError::UnexpectedStatus {
            status,
            message: error_message(body),
        }),
    }
}

/// 200 deleted; 404 "Person is not found." means already gone.
fn delete_outcome(status: StatusCode, body: &str) -> Result<bool, FaceApiError> {
    if status == StatusCode::OK {
        return Ok(true);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(detail) = ErrorBody::parse(body) {
            if detail.message.contains(PERSON_NOT_FOUND) {
                return Ok(false);
            }
        }
    }
    Err(FaceApiError::UnexpectedStatus {
        status,
        message: error_message(body),
    })
}

fn train_triggered(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::ACCEPTED
}
