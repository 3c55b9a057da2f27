use crate::config::Settings;
use crate::services::dialogue::{Alternative, CallFailure, DialogueTurnResult, Hypothesis};

use super::timer::TimerHandle;

/// Identifies one dialogue round trip. Replies for any other id are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub u64);

/// Identifies one recognition session (start .. stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(pub u64);

/// Identifies one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

/// Everything that can reach the supervisor's inbox.
#[derive(Debug, Clone)]
pub enum Event {
    /// Commands from the UI shell.
    Control(ControlCommand),
    /// Signals from the recognition provider.
    Recognition(RecognitionSignal),
    /// Signals from the synthesis provider.
    Synthesis(SynthesisSignal),
    DialogueReply {
        call: CallId,
        outcome: Result<DialogueTurnResult, CallFailure>,
    },
    TimerFired(TimerHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Setup(Box<Settings>),
    Prepare,
    Start,
    Stop,
    TurnPage(String),
    /// Generic user control: resume, barge-in, click-to-continue.
    Click,
    Pause,
    Select(Alternative),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionSignal {
    Ready,
    Failed(String),
    Started { capture: CaptureId },
    /// Non-final result: the user is talking.
    Partial { capture: CaptureId },
    Final { capture: CaptureId, hypotheses: Vec<Hypothesis> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisSignal {
    Ready { voice: String },
    Failed(String),
    Started { utterance: UtteranceId },
    Ended { utterance: UtteranceId },
}

impl Event {
    pub fn control(command: ControlCommand) -> Self {
        Event::Control(command)
    }

    pub fn setup(settings: Settings) -> Self {
        Event::Control(ControlCommand::Setup(Box::new(settings)))
    }
}
