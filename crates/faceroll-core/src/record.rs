//! Enrollment record: which person id belongs to a user.
//!
//! A re-enrollment creates a fresh person and keeps it pending until the new
//! session succeeds; only then is the superseded person deleted. The record
//! lives in memory only; persisting it is left to the embedding application.

use crate::service::FaceService;
use crate::types::PersonIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRecord {
    pub username: String,
    pub group_id: String,
    person_id: Option<String>,
    pending_person_id: Option<String>,
}

impl EnrollmentRecord {
    pub fn new(username: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            group_id: group_id.into(),
            person_id: None,
            pending_person_id: None,
        }
    }

    /// Record an enrollment that already exists with the service.
    pub fn with_existing(mut self, person_id: impl Into<String>) -> Self {
        self.person_id = Some(person_id.into()).filter(|id: &String| !id.is_empty());
        self
    }

    pub fn person_id(&self) -> Option<&str> {
        self.person_id.as_deref()
    }

    pub fn pending_person_id(&self) -> Option<&str> {
        self.pending_person_id.as_deref()
    }

    pub fn is_reenrollment(&self) -> bool {
        self.person_id.is_some()
    }

    /// The person a session works on: the pending one if any, else the current one.
    pub fn target_person(&self) -> Option<PersonIdentity> {
        self.pending_person_id
            .as_ref()
            .or(self.person_id.as_ref())
            .map(|id| PersonIdentity::new(self.group_id.clone(), id.clone()))
    }

    /// Create a new person for this user and stage it as pending.
    pub async fn begin<S: FaceService>(&mut self, service: &S) -> Result<PersonIdentity, S::Error> {
        let person_id = service.create_person(&self.group_id, &self.username).await?;
        tracing::info!(
            user = %self.username,
            person = %person_id,
            reenrollment = self.is_reenrollment(),
            "person created"
        );
        self.pending_person_id = Some(person_id.clone());
        Ok(PersonIdentity::new(self.group_id.clone(), person_id))
    }

    /// Promote the pending person after a successful session, deleting the
    /// person it supersedes.
    ///
    /// Returns `Ok(false)` when there was nothing to promote. If deleting the
    /// old person fails the record is left unchanged.
    pub async fn commit<S: FaceService>(&mut self, service: &S) -> Result<bool, S::Error> {
        let Some(pending) = self.pending_person_id.clone() else {
            return Ok(false);
        };

        if let Some(old) = self.person_id.clone() {
            let old = PersonIdentity::new(self.group_id.clone(), old);
            let deleted = service.delete_person(&old).await?;
            tracing::info!(person = %old.person_id, deleted, "superseded person removed");
        }

        self.person_id = Some(pending);
        self.pending_person_id = None;
        Ok(true)
    }

    /// Drop the pending person after a failed session.
    pub fn abandon(&mut self) -> Option<String> {
        self.pending_person_id.take()
    }
}
