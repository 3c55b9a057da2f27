use std::collections::HashMap;
use std::path::Path;

use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use ::config::builder::DefaultState;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::services::dialogue::wire::DEFAULT_PROTOCOL_VERSION;

/// Prefix of the environment variables read on top of the settings file,
/// e.g. `VOICEDM_ENDPOINT`, `VOICEDM_CLICK_TO_SKIP`.
pub const ENV_PREFIX: &str = "VOICEDM";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("cannot load settings: {0}")]
    Source(#[from] ::config::ConfigError),
}

/// Everything a conversation needs to be set up.
/// Delivered to the supervisor with the `SETUP` command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Dialogue server URL (POST target).
    pub endpoint: String,
    pub device_id: String,
    pub protocol_version: String,
    /// Merged into the session object of the start-session request.
    /// Accepts an object, or a JSON-encoded object when set from the environment.
    #[serde(deserialize_with = "session_extra")]
    pub session_extra: Map<String, Value>,
    pub locale: String,
    pub voice: String,
    /// Used when the server sends no speech-complete timeout.
    pub asr_default_complete_timeout_ms: u64,
    /// Used when listening is resumed after a click-to-continue pause.
    pub asr_default_no_input_timeout_ms: u64,
    /// Click while speaking skips the prompt instead of pausing it.
    pub click_to_skip: bool,
    /// Delay before re-polling the server on turns that skip listening.
    pub passivity_retry_delay_ms: u64,
    pub request_timeout_ms: u64,
    /// External command used for speech output instead of the console.
    pub synthesizer_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            device_id: format!("voicedm-{}", Uuid::new_v4()),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            session_extra: Map::new(),
            locale: "en-US".to_string(),
            voice: "en-US-DavisNeural".to_string(),
            asr_default_complete_timeout_ms: 0,
            asr_default_no_input_timeout_ms: 5000,
            click_to_skip: false,
            passivity_retry_delay_ms: 0,
            request_timeout_ms: 10_000,
            synthesizer_command: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SessionExtra {
    Object(Map<String, Value>),
    Encoded(String),
}

fn session_extra<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match SessionExtra::deserialize(deserializer)? {
        SessionExtra::Object(map) => Ok(map),
        SessionExtra::Encoded(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(D::Error::custom(format!("session_extra is not a JSON object: {text}"))),
        },
    }
}

impl Settings {
    /// Defaults, then the optional JSON settings file, then `VOICEDM_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::layered(path, None)
    }

    /// Defaults overridden by `VOICEDM_*` environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::layered(None, None)
    }

    /// Like [`Settings::load`], reading variables from `vars` instead of the
    /// process environment when given.
    pub fn layered(path: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Json));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true).source(vars));

        Self::build(builder)
    }

    /// Parse a JSON settings document; missing keys keep their defaults.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(document, FileFormat::Json)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.synthesizer_command = settings
            .synthesizer_command
            .filter(|command| !command.trim().is_empty());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Missing("endpoint"));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid { key: "endpoint", value: self.endpoint.clone() });
        }
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::Missing("device_id"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid { key: "request_timeout_ms", value: "0".to_string() });
        }
        Ok(())
    }
}
