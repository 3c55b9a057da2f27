use std::time::Duration;

use tracing::{debug, warn};

use crate::services::dialogue::Hypothesis;

use super::effect::SideEffect;
use super::event::{CaptureId, RecognitionSignal};
use super::timer::{TimerName, TimerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningPhase {
    /// Capture running, nobody has spoken yet.
    NoInput,
    /// The user is talking, nothing final yet.
    InProgress,
    /// A final result is pending; waiting out the completion debounce.
    Matched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    Uninitialized,
    Initializing,
    Ready,
    Listening(ListeningPhase),
    Paused,
    Fail,
}

/// What the actor reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    Ready,
    Started,
    Recognised(Vec<Hypothesis>),
    NoInput,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListenParams {
    /// `None` listens until something is said.
    pub no_input_timeout: Option<Duration>,
    pub complete_timeout: Duration,
    pub hints: Vec<String>,
}

/// One recognition session at a time, driven purely by signals and timers.
#[derive(Debug)]
pub struct RecognitionActor {
    state: RecognitionState,
    locale: String,
    capture: Option<CaptureId>,
    next_capture: u64,
    complete_timeout: Duration,
    pending: Vec<Hypothesis>,
}

impl Default for RecognitionActor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionActor {
    pub fn new() -> Self {
        Self {
            state: RecognitionState::Uninitialized,
            locale: String::new(),
            capture: None,
            next_capture: 0,
            complete_timeout: Duration::ZERO,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> RecognitionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == RecognitionState::Ready
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state, RecognitionState::Listening(_))
    }

    pub fn capture(&self) -> Option<CaptureId> {
        self.capture
    }

    pub fn initialize(&mut self, locale: &str, effects: &mut Vec<SideEffect>) {
        match self.state {
            RecognitionState::Uninitialized => {
                self.locale = locale.to_string();
                self.state = RecognitionState::Initializing;
                effects.push(SideEffect::InitRecognizer { locale: self.locale.clone() });
            }
            other => debug!(?other, "recognizer already initialized"),
        }
    }

    /// Begin capture. Accepted from Ready and Paused; false otherwise.
    pub fn start(&mut self, params: ListenParams, timers: &mut TimerRegistry, effects: &mut Vec<SideEffect>) -> bool {
        if !matches!(self.state, RecognitionState::Ready | RecognitionState::Paused) {
            warn!(state = ?self.state, "recognizer cannot start listening");
            return false;
        }

        self.next_capture += 1;
        let capture = CaptureId(self.next_capture);
        self.capture = Some(capture);
        self.complete_timeout = params.complete_timeout;
        self.pending.clear();

        if let Some(delay) = params.no_input_timeout {
            timers.arm(TimerName::NoInput, delay, effects);
        }
        effects.push(SideEffect::StartCapture {
            capture,
            locale: self.locale.clone(),
            hints: params.hints,
        });
        self.state = RecognitionState::Listening(ListeningPhase::NoInput);
        true
    }

    /// Stop capture and disarm timers, keeping the actor resumable by a fresh `start`.
    pub fn pause(&mut self, timers: &mut TimerRegistry, effects: &mut Vec<SideEffect>) -> bool {
        if !self.is_listening() {
            return false;
        }
        self.leave_listening(timers, effects);
        self.state = RecognitionState::Paused;
        true
    }

    /// Abandon any session without reporting an outcome.
    pub fn stop(&mut self, timers: &mut TimerRegistry, effects: &mut Vec<SideEffect>) {
        match self.state {
            RecognitionState::Listening(_) => {
                self.leave_listening(timers, effects);
                self.state = RecognitionState::Ready;
            }
            RecognitionState::Paused => self.state = RecognitionState::Ready,
            _ => {}
        }
        self.pending.clear();
    }

    /// Back to Uninitialized for a new setup. Capture ids keep counting so late
    /// signals from the previous provider stay stale.
    pub fn reset(&mut self, timers: &mut TimerRegistry, effects: &mut Vec<SideEffect>) {
        if self.is_listening() {
            self.leave_listening(timers, effects);
        }
        self.capture = None;
        self.pending.clear();
        self.state = RecognitionState::Uninitialized;
    }

    pub fn on_signal(
        &mut self,
        signal: RecognitionSignal,
        timers: &mut TimerRegistry,
        effects: &mut Vec<SideEffect>,
    ) -> Option<RecognitionOutcome> {
        match signal {
            RecognitionSignal::Ready => {
                if self.state != RecognitionState::Initializing {
                    debug!(state = ?self.state, "unexpected recognizer ready");
                    return None;
                }
                self.state = RecognitionState::Ready;
                Some(RecognitionOutcome::Ready)
            }
            RecognitionSignal::Failed(reason) => {
                if self.state == RecognitionState::Fail {
                    return None;
                }
                if self.is_listening() {
                    self.leave_listening(timers, effects);
                }
                self.state = RecognitionState::Fail;
                Some(RecognitionOutcome::Error(reason))
            }
            RecognitionSignal::Started { capture } => {
                if !self.owns(capture) {
                    return None;
                }
                Some(RecognitionOutcome::Started)
            }
            RecognitionSignal::Partial { capture } => {
                if !self.owns(capture) {
                    return None;
                }
                // In Matched only another final re-arms the commit.
                if self.state == RecognitionState::Listening(ListeningPhase::NoInput) {
                    timers.cancel(TimerName::NoInput, effects);
                    self.state = RecognitionState::Listening(ListeningPhase::InProgress);
                }
                None
            }
            RecognitionSignal::Final { capture, hypotheses } => {
                if !self.owns(capture) {
                    return None;
                }
                timers.cancel(TimerName::NoInput, effects);
                self.pending = hypotheses;
                timers.arm(TimerName::CompleteTimeout, self.complete_timeout, effects);
                self.state = RecognitionState::Listening(ListeningPhase::Matched);
                None
            }
        }
    }

    /// Called with a timer the registry has already accepted as live.
    pub fn on_timer(
        &mut self,
        name: TimerName,
        timers: &mut TimerRegistry,
        effects: &mut Vec<SideEffect>,
    ) -> Option<RecognitionOutcome> {
        match (name, self.state) {
            (TimerName::NoInput, RecognitionState::Listening(ListeningPhase::NoInput)) => {
                self.leave_listening(timers, effects);
                self.state = RecognitionState::Ready;
                Some(RecognitionOutcome::NoInput)
            }
            (TimerName::CompleteTimeout, RecognitionState::Listening(ListeningPhase::Matched)) => {
                self.leave_listening(timers, effects);
                self.state = RecognitionState::Ready;
                Some(RecognitionOutcome::Recognised(std::mem::take(&mut self.pending)))
            }
            (name, state) => {
                debug!(?name, ?state, "timer ignored by recognizer");
                None
            }
        }
    }

    fn owns(&self, capture: CaptureId) -> bool {
        let live = self.is_listening() && self.capture == Some(capture);
        if !live {
            debug!(?capture, current = ?self.capture, "stale recognition signal");
        }
        live
    }

    fn leave_listening(&mut self, timers: &mut TimerRegistry, effects: &mut Vec<SideEffect>) {
        timers.cancel(TimerName::NoInput, effects);
        timers.cancel(TimerName::CompleteTimeout, effects);
        if let Some(capture) = self.capture.take() {
            effects.push(SideEffect::AbortCapture { capture });
        }
    }
}
