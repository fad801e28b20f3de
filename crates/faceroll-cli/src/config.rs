use faceroll_api::ServiceConfig;
use faceroll_core::EnrollSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid person group id {0:?}: use 1-64 lowercase letters, digits, '-' or '_'")]
    InvalidGroupId(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// CLI configuration, loaded from a TOML file and `FACEROLL_*` environment
/// variables. Environment values win over the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Large person group every enrollment is stored in.
    pub person_group_id: String,
    pub service: ServiceConfig,
    pub enroll: EnrollSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            person_group_id: "faceroll".to_string(),
            service: ServiceConfig::default(),
            enroll: EnrollSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path(&env) {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = env("FACEROLL_ENDPOINT") {
            self.service.endpoint = v;
        }
        if let Some(v) = env("FACEROLL_SUBSCRIPTION_KEY") {
            self.service.subscription_key = v;
        }
        if let Some(v) = env("FACEROLL_PERSON_GROUP") {
            self.person_group_id = v;
        }
        if let Some(v) = env("FACEROLL_RECOGNITION_MODEL") {
            self.service.recognition_model = v;
        }
        if let Some(v) = env_parse(env, "FACEROLL_TARGET_FRAMES")? {
            self.enroll.target_enroll_frames = v;
        }
        if let Some(v) = env_parse(env, "FACEROLL_TIMEOUT_MS")? {
            self.enroll.timeout_ms = v;
        }
        if let Some(v) = env_parse(env, "FACEROLL_MAX_VERIFY_ATTEMPTS")? {
            self.enroll.max_verify_attempts = Some(v);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.service.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("service.endpoint (FACEROLL_ENDPOINT)"));
        }
        if self.service.subscription_key.trim().is_empty() {
            return Err(ConfigError::Missing(
                "service.subscription_key (FACEROLL_SUBSCRIPTION_KEY)",
            ));
        }
        if !valid_group_id(&self.person_group_id) {
            return Err(ConfigError::InvalidGroupId(self.person_group_id.clone()));
        }
        if self.enroll.target_enroll_frames == 0 {
            return Err(ConfigError::Zero("enroll.target_enroll_frames"));
        }
        if self.enroll.timeout_ms == 0 {
            return Err(ConfigError::Zero("enroll.timeout_ms"));
        }
        Ok(())
    }
}

/// `$FACEROLL_CONFIG`, else `$XDG_CONFIG_HOME/faceroll/config.toml`,
/// else `~/.config/faceroll/config.toml`.
fn default_path(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = env("FACEROLL_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let base = env("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("faceroll").join("config.toml"))
}

fn env_parse<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = env(key) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::InvalidEnv { key, value }),
    }
}

fn valid_group_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn scratch_file(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("faceroll-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    const CREDENTIALS: &[(&str, &str)] = &[
        ("FACEROLL_ENDPOINT", "https://example.cognitiveservices.azure.com/"),
        ("FACEROLL_SUBSCRIPTION_KEY", "secret"),
    ];

    #[test]
    fn test_env_only() {
        let config = AppConfig::load_with(None, env_of(CREDENTIALS)).unwrap();
        assert_eq!(config.person_group_id, "faceroll");
        assert_eq!(config.service.subscription_key, "secret");
        assert_eq!(config.enroll, EnrollSettings::default());
    }

    #[test]
    fn test_file_values() {
        let path = scratch_file(
            r#"
            person_group_id = "office-staff"

            [service]
            endpoint = "https://file.cognitiveservices.azure.com/"
            subscription_key = "from-file"

            [enroll]
            target_enroll_frames = 3
            timeout_ms = 15000

            [enroll.quality]
            max_yaw = 10.0
            "#,
        );

        let config = AppConfig::load_with(Some(&path), env_of(&[])).unwrap();
        assert_eq!(config.person_group_id, "office-staff");
        assert_eq!(config.service.subscription_key, "from-file");
        assert_eq!(config.service.detection_model, "detection_01");
        assert_eq!(config.enroll.target_enroll_frames, 3);
        assert_eq!(config.enroll.timeout_ms, 15_000);
        assert_eq!(config.enroll.settle_delay_ms, 500);
        assert_eq!(config.enroll.quality.max_yaw, 10.0);
        assert_eq!(config.enroll.quality.max_pitch, 20.0);
    }

    #[test]
    fn test_env_overrides_file() {
        let path = scratch_file(
            r#"
            [service]
            endpoint = "https://file.cognitiveservices.azure.com/"
            subscription_key = "from-file"
            "#,
        );
        let env = env_of(&[
            ("FACEROLL_SUBSCRIPTION_KEY", "from-env"),
            ("FACEROLL_PERSON_GROUP", "lab"),
            ("FACEROLL_TARGET_FRAMES", "7"),
            ("FACEROLL_MAX_VERIFY_ATTEMPTS", "4"),
        ]);

        let config = AppConfig::load_with(Some(&path), env).unwrap();
        assert_eq!(config.service.endpoint, "https://file.cognitiveservices.azure.com/");
        assert_eq!(config.service.subscription_key, "from-env");
        assert_eq!(config.person_group_id, "lab");
        assert_eq!(config.enroll.target_enroll_frames, 7);
        assert_eq!(config.enroll.max_verify_attempts, Some(4));
    }

    #[test]
    fn test_default_path_from_env() {
        let path = scratch_file(
            r#"
            person_group_id = "from-default-path"
            [service]
            endpoint = "https://example.com/"
            subscription_key = "k"
            "#,
        );
        let env = env_of(&[("FACEROLL_CONFIG", path.to_str().unwrap())]);

        let config = AppConfig::load_with(None, env).unwrap();
        assert_eq!(config.person_group_id, "from-default-path");
    }

    #[test]
    fn test_xdg_default_path() {
        let env = env_of(&[("XDG_CONFIG_HOME", "/cfg"), ("HOME", "/home/u")]);
        assert_eq!(
            default_path(&env),
            Some(PathBuf::from("/cfg/faceroll/config.toml"))
        );
        let env = env_of(&[("HOME", "/home/u")]);
        assert_eq!(
            default_path(&env),
            Some(PathBuf::from("/home/u/.config/faceroll/config.toml"))
        );
        assert_eq!(default_path(&env_of(&[])), None);
    }

    #[test]
    fn test_missing_credentials() {
        let err = AppConfig::load_with(None, env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));

        let env = env_of(&[("FACEROLL_ENDPOINT", "https://example.com/")]);
        let err = AppConfig::load_with(None, env).unwrap_err();
        assert!(err.to_string().contains("FACEROLL_SUBSCRIPTION_KEY"));
    }

    #[test]
    fn test_bad_env_number() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("FACEROLL_TIMEOUT_MS", "soon"));
        let err = AppConfig::load_with(None, env_of(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                key: "FACEROLL_TIMEOUT_MS",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_target_rejected() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("FACEROLL_TARGET_FRAMES", "0"));
        let err = AppConfig::load_with(None, env_of(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Zero(_)));
    }

    #[test]
    fn test_group_id_rules() {
        assert!(valid_group_id("staff_2024-a"));
        assert!(!valid_group_id(""));
        assert!(!valid_group_id("Staff"));
        assert!(!valid_group_id("has space"));
        assert!(!valid_group_id(&"a".repeat(65)));
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = PathBuf::from("/nonexistent/faceroll/config.toml");
        let err = AppConfig::load_with(Some(&path), env_of(CREDENTIALS)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let path = scratch_file("person_group_id = [");
        let err = AppConfig::load_with(Some(&path), env_of(CREDENTIALS)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
