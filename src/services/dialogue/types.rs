use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action names that close the conversation once the prompt carrying them has been spoken.
pub const END_ACTIONS: [&str; 3] = ["EndOfSection", "EndSession", "EndConversation"];

/// Opaque session object owned by the dialogue server.
/// Echoed back verbatim on every call, replaced wholesale by every reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(pub Map<String, Value>);

impl Session {
    /// Session seed for a start-session request.
    pub fn for_device(device_id: &str, extra: &Map<String, Value>) -> Self {
        let mut map = Map::new();
        map.insert("device_id".to_string(), Value::String(device_id.to_string()));
        for (key, value) in extra {
            map.insert(key.clone(), value.clone());
        }
        Self(map)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.0.get("session_id").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// One recognition candidate, in the order the recognizer produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub utterance: String,
    pub confidence: f32,
}

impl Hypothesis {
    pub fn new(utterance: impl Into<String>, confidence: f32) -> Self {
        Self {
            utterance: utterance.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAttribute {
    pub attribute: String,
    #[serde(default)]
    pub value: Value,
}

/// A choice the server offers for non-spoken (haptic) selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub semantic_expression: String,
    #[serde(default)]
    pub visual_information: Vec<VisualAttribute>,
}

impl Alternative {
    pub fn new(semantic_expression: impl Into<String>) -> Self {
        Self {
            semantic_expression: semantic_expression.into(),
            visual_information: Vec::new(),
        }
    }

    /// Caption shown for this alternative, if the server provided one.
    pub fn caption(&self) -> Option<&str> {
        self.visual_information
            .iter()
            .find(|attr| attr.attribute == "name")
            .and_then(|attr| attr.value.as_str())
    }
}

/// Everything the orchestrator reads from one dialogue-server reply.
/// Never merged: each reply replaces the previous result entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueTurnResult {
    pub session: Session,
    pub utterance: String,
    /// `None` waits forever, `Some(0)` skips listening altogether.
    pub expected_passivity_ms: Option<u64>,
    pub speech_complete_timeout_ms: u64,
    pub actions: Vec<Action>,
    pub active_topic: Option<String>,
    pub available_topics: Vec<String>,
    pub asr_hints: Vec<String>,
    pub visual_alternatives: Vec<Alternative>,
    pub visual_output: Vec<VisualAttribute>,
    pub moves: Value,
}

impl DialogueTurnResult {
    pub fn ends_conversation(&self) -> bool {
        self.actions
            .iter()
            .any(|action| END_ACTIONS.contains(&action.name.as_str()))
    }

    pub fn skips_listening(&self) -> bool {
        self.expected_passivity_ms == Some(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    StartSession,
    SelectSegment,
    NaturalLanguageInput,
    HapticInput,
    Passivity,
}

/// A single dialogue-server round trip, fully described.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueRequest {
    StartSession {
        device_id: String,
        extra: Map<String, Value>,
    },
    StartSessionWithSegment {
        device_id: String,
        extra: Map<String, Value>,
        segment: String,
    },
    SelectSegment {
        session: Session,
        segment: String,
    },
    SubmitUtterance {
        session: Session,
        topic: Option<String>,
        moves: Value,
        hypotheses: Vec<Hypothesis>,
    },
    SubmitSelection {
        session: Session,
        alternative: Alternative,
    },
    PingPassivity {
        session: Session,
    },
}

impl DialogueRequest {
    pub fn kind(&self) -> CallKind {
        match self {
            DialogueRequest::StartSession { .. } => CallKind::StartSession,
            DialogueRequest::StartSessionWithSegment { .. } => CallKind::StartSession,
            DialogueRequest::SelectSegment { .. } => CallKind::SelectSegment,
            DialogueRequest::SubmitUtterance { .. } => CallKind::NaturalLanguageInput,
            DialogueRequest::SubmitSelection { .. } => CallKind::HapticInput,
            DialogueRequest::PingPassivity { .. } => CallKind::Passivity,
        }
    }
}
