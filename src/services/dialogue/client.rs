use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::DialogueError;
use super::types::{Alternative, DialogueRequest, DialogueTurnResult, Hypothesis, Session};
use super::wire::{self, RequestEnvelope};
use crate::config::Settings;

/// Anything that can perform a dialogue round trip.
/// The reactor only ever talks to the server through this seam.
#[async_trait]
pub trait DialogueBackend: Send + Sync {
    async fn execute(&self, request: DialogueRequest) -> Result<DialogueTurnResult, DialogueError>;
}

#[derive(Clone)]
pub struct DialogueClient {
    client: Client,
    endpoint: String,
    version: String,
}

impl DialogueClient {
    pub fn new(endpoint: impl Into<String>, version: impl Into<String>, timeout: Duration) -> Result<Self, DialogueError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
            version: version.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, DialogueError> {
        Self::new(
            settings.endpoint.clone(),
            settings.protocol_version.clone(),
            Duration::from_millis(settings.request_timeout_ms),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn start_session(
        &self,
        device_id: &str,
        extra: &Map<String, Value>,
    ) -> Result<DialogueTurnResult, DialogueError> {
        self.round_trip(&wire::start_session(&self.version, device_id, extra)).await
    }

    pub async fn start_session_with_segment(
        &self,
        device_id: &str,
        extra: &Map<String, Value>,
        segment: &str,
    ) -> Result<DialogueTurnResult, DialogueError> {
        self.round_trip(&wire::start_session_with_segment(&self.version, device_id, extra, segment))
            .await
    }

    pub async fn select_segment(&self, session: &Session, segment: &str) -> Result<DialogueTurnResult, DialogueError> {
        self.round_trip(&wire::select_segment(&self.version, session, segment)).await
    }

    pub async fn submit_utterance(
        &self,
        session: &Session,
        topic: Option<&str>,
        moves: &Value,
        hypotheses: &[Hypothesis],
    ) -> Result<DialogueTurnResult, DialogueError> {
        self.round_trip(&wire::natural_language_input(&self.version, session, topic, moves, hypotheses))
            .await
    }

    pub async fn submit_selection(
        &self,
        session: &Session,
        alternative: &Alternative,
    ) -> Result<DialogueTurnResult, DialogueError> {
        self.round_trip(&wire::haptic_input(&self.version, session, alternative)).await
    }

    pub async fn ping_passivity(&self, session: &Session) -> Result<DialogueTurnResult, DialogueError> {
        self.round_trip(&wire::passivity(&self.version, session)).await
    }

    async fn round_trip(&self, envelope: &RequestEnvelope) -> Result<DialogueTurnResult, DialogueError> {
        let response = self.client.post(&self.endpoint).json(envelope).send().await?;

        if !response.status().is_success() {
            return Err(DialogueError::Status(response.status()));
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "dialogue reply received");
        wire::decode_response(&body)
    }
}

#[async_trait]
impl DialogueBackend for DialogueClient {
    async fn execute(&self, request: DialogueRequest) -> Result<DialogueTurnResult, DialogueError> {
        match request {
            DialogueRequest::StartSession { device_id, extra } => self.start_session(&device_id, &extra).await,
            DialogueRequest::StartSessionWithSegment { device_id, extra, segment } => {
                self.start_session_with_segment(&device_id, &extra, &segment).await
            }
            DialogueRequest::SelectSegment { session, segment } => self.select_segment(&session, &segment).await,
            DialogueRequest::SubmitUtterance { session, topic, moves, hypotheses } => {
                self.submit_utterance(&session, topic.as_deref(), &moves, &hypotheses).await
            }
            DialogueRequest::SubmitSelection { session, alternative } => {
                self.submit_selection(&session, &alternative).await
            }
            DialogueRequest::PingPassivity { session } => self.ping_passivity(&session).await,
        }
    }
}
