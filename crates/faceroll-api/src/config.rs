use serde::Deserialize;
use std::fmt;

/// Connection settings for the face service.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the service resource, e.g. `https://<name>.cognitiveservices.azure.com/`.
    pub endpoint: String,
    /// Subscription key sent as `Ocp-Apim-Subscription-Key`.
    pub subscription_key: String,
    /// Recognition model used for detection and new person groups.
    pub recognition_model: String,
    /// Detection model; attribute detection requires `detection_01`.
    pub detection_model: String,
    /// Overrides the default `faceroll/<version> <os>` user agent.
    pub user_agent: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            subscription_key: String::new(),
            recognition_model: "recognition_03".to_string(),
            detection_model: "detection_01".to_string(),
            user_agent: None,
        }
    }
}

impl ServiceConfig {
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!(
                "faceroll/{} {}",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            )
        })
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("subscription_key", &"<redacted>")
            .field("recognition_model", &self.recognition_model)
            .field("detection_model", &self.detection_model)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
