use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one supervisor, from setup to a terminal or resting state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for settings.
    #[default]
    BeforeSetup,
    /// Session being opened on the dialogue server.
    GetPages,
    /// Session open, speech providers not yet initialized.
    BeforePrepare,
    /// Speech providers initializing.
    Prepare,
    /// Ready to start a conversation.
    Idle,
    /// Conversation running: Adjacency and DialogueCalls progress in parallel.
    Active,
    /// The server closed the conversation. `START` reuses the session.
    End,
    /// Halted by the user. `START` resumes, `SETUP` starts over.
    Stopped,
    /// Terminal until the next `SETUP`.
    Fail,
}

/// Coarse state exposed to the UI shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Initiating,
    BeforePrepare,
    Ready,
    Active,
    End,
    Stopped,
    Fail,
}

impl Phase {
    pub fn view(self) -> View {
        match self {
            Phase::BeforeSetup | Phase::GetPages | Phase::Prepare => View::Initiating,
            Phase::BeforePrepare => View::BeforePrepare,
            Phase::Idle => View::Ready,
            Phase::Active => View::Active,
            Phase::End => View::End,
            Phase::Stopped => View::Stopped,
            Phase::Fail => View::Fail,
        }
    }

    /// Phases from which a conversation can be (re)started.
    pub fn can_start(self) -> bool {
        matches!(self, Phase::Idle | Phase::End | Phase::Stopped)
    }

    /// Phases from which `SETUP` is honoured.
    pub fn accepts_setup(self) -> bool {
        matches!(self, Phase::BeforeSetup | Phase::Stopped | Phase::Fail)
    }
}

/// What the audio device is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Activity {
    Idle,
    Speaking,
    SpeechPaused,
    Listening,
    ListeningPaused,
    /// A dialogue call is in flight and nothing is audible.
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub view: View,
    pub activity: Activity,
}

impl Default for Status {
    fn default() -> Self {
        Self { view: View::Initiating, activity: Activity::Idle }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            View::Initiating => "initiating",
            View::BeforePrepare => "before-prepare",
            View::Ready => "ready",
            View::Active => "active",
            View::End => "end",
            View::Stopped => "stopped",
            View::Fail => "fail",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Activity::Idle => "idle",
            Activity::Speaking => "speaking",
            Activity::SpeechPaused => "speech-paused",
            Activity::Listening => "listening",
            Activity::ListeningPaused => "listening-paused",
            Activity::Waiting => "waiting",
        };
        f.write_str(label)
    }
}
