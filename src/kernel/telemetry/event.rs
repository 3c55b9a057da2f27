use serde::{Deserialize, Serialize};

use crate::kernel::view::Phase;
use crate::services::dialogue::{CallKind, FailureClass};

// Allowed: enums, counts, ids
// Forbidden: utterances, hypotheses, confidence scores, session payloads

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    PhaseTransition {
        from: Phase,
        to: Phase,
    },

    DialogueCall {
        kind: CallKind,
        outcome: CallOutcome,
    },

    /// A prompt was spoken to the end (or skipped) and the turn moved on.
    TurnCompleted {
        listened: bool,
    },

    /// Only the count, never the text.
    Recognition {
        hypotheses: usize,
    },

    NoInputTimeout,

    BargeIn {
        kind: BargeInKind,
    },

    /// A dialogue reply arrived for a call that was no longer live.
    StaleReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    Landed,
    Failed(FailureClass),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BargeInKind {
    PauseSpeech,
    ResumeSpeech,
    SkipSpeech,
    PauseListening,
    ResumeListening,
    Selection,
}
