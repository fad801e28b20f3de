//! faceroll-api — Client for the remote face service.
//!
//! Wraps the large-person-group REST API (person management, detection,
//! persisted faces, verification, training) and implements
//! [`faceroll_core::FaceService`] on top of it.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod wire;

pub use client::{FaceApiClient, FaceApiError, GroupStatus};
pub use config::ServiceConfig;
pub use wire::{TrainingState, TrainingStatus};
