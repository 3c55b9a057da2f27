use std::time::Duration;

use crate::services::dialogue::DialogueRequest;

use super::event::{CallId, CaptureId, UtteranceId};
use super::timer::TimerHandle;
use super::view::Status;

/// Instructions the kernel hands to the driver. The kernel itself never performs I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    InitRecognizer { locale: String },
    StartCapture { capture: CaptureId, locale: String, hints: Vec<String> },
    AbortCapture { capture: CaptureId },

    InitSynthesizer { voice: String },
    Speak { utterance: UtteranceId, text: String },
    PauseSpeech { utterance: UtteranceId },
    ResumeSpeech { utterance: UtteranceId },
    CancelSpeech { utterance: UtteranceId },

    ArmTimer { handle: TimerHandle, delay: Duration },
    CancelTimer { handle: TimerHandle },

    CallDialogue { call: CallId, request: DialogueRequest },

    Publish(Status),
}
