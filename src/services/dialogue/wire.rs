//! JSON shapes exchanged with the dialogue server.
//!
//! Requests carry `{version, session, request}` where `request` holds exactly one
//! request kind (start-session with segment is the only combined form).
//! Responses are decoded leniently; the only hard requirement is `output`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::DialogueError;
use super::types::{
    Action, Alternative, DialogueRequest, DialogueTurnResult, Hypothesis, Session, VisualAttribute,
};

pub const DEFAULT_PROTOCOL_VERSION: &str = "3.4";

#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    pub version: String,
    pub session: Map<String, Value>,
    pub request: RequestBody,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_session: Option<Empty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_input: Option<SemanticInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_language_input: Option<NaturalLanguageInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passivity: Option<Empty>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticInput {
    pub interpretations: Vec<Interpretation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interpretation {
    pub modality: &'static str,
    pub moves: Vec<SemanticMove>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticMove {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddd: Option<String>,
    pub perception_confidence: f32,
    pub understanding_confidence: f32,
    pub semantic_expression: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NaturalLanguageInput {
    pub modality: &'static str,
    pub hypotheses: Vec<Hypothesis>,
}

fn segment_move(segment: &str) -> SemanticInput {
    SemanticInput {
        interpretations: vec![Interpretation {
            modality: "other",
            moves: vec![SemanticMove {
                ddd: Some(segment.to_string()),
                perception_confidence: 1.0,
                understanding_confidence: 1.0,
                semantic_expression: "request(top)".to_string(),
            }],
        }],
    }
}

pub fn start_session(version: &str, device_id: &str, extra: &Map<String, Value>) -> RequestEnvelope {
    RequestEnvelope {
        version: version.to_string(),
        session: Session::for_device(device_id, extra).0,
        request: RequestBody {
            start_session: Some(Empty {}),
            ..RequestBody::default()
        },
    }
}

pub fn start_session_with_segment(
    version: &str,
    device_id: &str,
    extra: &Map<String, Value>,
    segment: &str,
) -> RequestEnvelope {
    let mut envelope = start_session(version, device_id, extra);
    envelope.request.semantic_input = Some(segment_move(segment));
    envelope
}

pub fn select_segment(version: &str, session: &Session, segment: &str) -> RequestEnvelope {
    RequestEnvelope {
        version: version.to_string(),
        session: session.0.clone(),
        request: RequestBody {
            semantic_input: Some(segment_move(segment)),
            ..RequestBody::default()
        },
    }
}

/// Speech input. The active topic and the last output moves ride along in the session.
pub fn natural_language_input(
    version: &str,
    session: &Session,
    topic: Option<&str>,
    moves: &Value,
    hypotheses: &[Hypothesis],
) -> RequestEnvelope {
    let mut session = session.0.clone();
    if let Some(topic) = topic {
        session.insert("ddd".to_string(), Value::String(topic.to_string()));
    }
    session.insert("moves".to_string(), moves.clone());

    RequestEnvelope {
        version: version.to_string(),
        session,
        request: RequestBody {
            natural_language_input: Some(NaturalLanguageInput {
                modality: "speech",
                hypotheses: hypotheses.to_vec(),
            }),
            ..RequestBody::default()
        },
    }
}

pub fn haptic_input(version: &str, session: &Session, alternative: &Alternative) -> RequestEnvelope {
    RequestEnvelope {
        version: version.to_string(),
        session: session.0.clone(),
        request: RequestBody {
            semantic_input: Some(SemanticInput {
                interpretations: vec![Interpretation {
                    modality: "haptic",
                    moves: vec![SemanticMove {
                        ddd: None,
                        perception_confidence: 1.0,
                        understanding_confidence: 1.0,
                        semantic_expression: alternative.semantic_expression.clone(),
                    }],
                }],
            }),
            ..RequestBody::default()
        },
    }
}

pub fn passivity(version: &str, session: &Session) -> RequestEnvelope {
    RequestEnvelope {
        version: version.to_string(),
        session: session.0.clone(),
        request: RequestBody {
            passivity: Some(Empty {}),
            ..RequestBody::default()
        },
    }
}

pub fn envelope_for(version: &str, request: &DialogueRequest) -> RequestEnvelope {
    match request {
        DialogueRequest::StartSession { device_id, extra } => start_session(version, device_id, extra),
        DialogueRequest::StartSessionWithSegment { device_id, extra, segment } => {
            start_session_with_segment(version, device_id, extra, segment)
        }
        DialogueRequest::SelectSegment { session, segment } => select_segment(version, session, segment),
        DialogueRequest::SubmitUtterance { session, topic, moves, hypotheses } => {
            natural_language_input(version, session, topic.as_deref(), moves, hypotheses)
        }
        DialogueRequest::SubmitSelection { session, alternative } => {
            haptic_input(version, session, alternative)
        }
        DialogueRequest::PingPassivity { session } => passivity(version, session),
    }
}

// --- Responses ---

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, deserialize_with = "nullable")]
    pub session: Session,
    #[serde(default)]
    pub context: Option<ResponseContext>,
    #[serde(default)]
    pub output: Option<ResponseOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContext {
    #[serde(default)]
    pub active_ddd: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub available_ddds: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub asr_hints: Vec<String>,
    #[serde(default)]
    pub expected_input: Option<ExpectedInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpectedInput {
    #[serde(default, deserialize_with = "nullable")]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseOutput {
    #[serde(default, deserialize_with = "nullable")]
    pub utterance: String,
    /// Seconds; `null` means no limit.
    #[serde(default)]
    pub expected_passivity: Option<f64>,
    /// Seconds.
    #[serde(default)]
    pub speech_complete_timeout: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub actions: Vec<Action>,
    #[serde(default, deserialize_with = "nullable")]
    pub visual_output: Vec<VisualOutput>,
    #[serde(default)]
    pub moves: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisualOutput {
    #[serde(default, deserialize_with = "nullable")]
    pub visual_information: Vec<VisualAttribute>,
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        ((seconds * 1000.0).round() as u64).max(1)
    } else {
        0
    }
}

impl ResponseEnvelope {
    /// Validation step: a reply without `output` never reaches the state machine.
    pub fn into_turn_result(self) -> Result<DialogueTurnResult, DialogueError> {
        let output = self.output.ok_or(DialogueError::MissingOutput)?;
        let context = self.context.unwrap_or_default();

        Ok(DialogueTurnResult {
            session: self.session,
            utterance: output.utterance,
            expected_passivity_ms: output.expected_passivity.map(seconds_to_ms),
            speech_complete_timeout_ms: output.speech_complete_timeout.map(seconds_to_ms).unwrap_or(0),
            actions: output.actions,
            active_topic: context.active_ddd,
            available_topics: context.available_ddds,
            asr_hints: context.asr_hints,
            visual_alternatives: context.expected_input.map(|input| input.alternatives).unwrap_or_default(),
            visual_output: output
                .visual_output
                .into_iter()
                .next()
                .map(|first| first.visual_information)
                .unwrap_or_default(),
            moves: output.moves,
        })
    }
}

pub fn decode_response(body: &str) -> Result<DialogueTurnResult, DialogueError> {
    let envelope: ResponseEnvelope = serde_json::from_str(body)?;
    envelope.into_turn_result()
}

#[cfg(test)]
mod tests {
    use super::seconds_to_ms;

    #[test]
    fn fractional_seconds_round_to_millis() {
        assert_eq!(seconds_to_ms(1.5), 1500);
        assert_eq!(seconds_to_ms(0.0004), 1);
        assert_eq!(seconds_to_ms(0.0), 0);
        assert_eq!(seconds_to_ms(-3.0), 0);
        assert_eq!(seconds_to_ms(f64::NAN), 0);
    }
}
