use tracing::{debug, warn};

use super::effect::SideEffect;
use super::event::{SynthesisSignal, UtteranceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisState {
    Uninitialized,
    Initializing,
    Ready,
    Speaking { paused: bool },
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Ready,
    Started,
    Complete,
    Error(String),
}

/// Owns at most one playback. Playback position lives in the engine; pause and
/// resume only toggle it.
#[derive(Debug)]
pub struct SynthesisActor {
    state: SynthesisState,
    voice: Option<String>,
    utterance: Option<UtteranceId>,
    next_utterance: u64,
    agenda: Option<String>,
}

impl Default for SynthesisActor {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisActor {
    pub fn new() -> Self {
        Self {
            state: SynthesisState::Uninitialized,
            voice: None,
            utterance: None,
            next_utterance: 0,
            agenda: None,
        }
    }

    pub fn state(&self) -> SynthesisState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SynthesisState::Ready
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, SynthesisState::Speaking { .. })
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn agenda(&self) -> Option<&str> {
        self.agenda.as_deref()
    }

    pub fn initialize(&mut self, voice: &str, effects: &mut Vec<SideEffect>) {
        match self.state {
            SynthesisState::Uninitialized => {
                self.state = SynthesisState::Initializing;
                effects.push(SideEffect::InitSynthesizer { voice: voice.to_string() });
            }
            other => debug!(?other, "synthesizer already initialized"),
        }
    }

    /// Start playback. An empty agenda completes on the spot.
    pub fn speak(&mut self, agenda: &str, effects: &mut Vec<SideEffect>) -> Option<SynthesisOutcome> {
        match self.state {
            SynthesisState::Ready => {}
            SynthesisState::Speaking { .. } => self.cancel(effects),
            other => {
                warn!(state = ?other, "synthesizer cannot speak");
                return None;
            }
        }

        if agenda.trim().is_empty() {
            return Some(SynthesisOutcome::Complete);
        }

        self.next_utterance += 1;
        let utterance = UtteranceId(self.next_utterance);
        self.utterance = Some(utterance);
        self.agenda = Some(agenda.to_string());
        self.state = SynthesisState::Speaking { paused: false };
        effects.push(SideEffect::Speak { utterance, text: agenda.to_string() });
        None
    }

    pub fn pause(&mut self, effects: &mut Vec<SideEffect>) -> bool {
        match (self.state, self.utterance) {
            (SynthesisState::Speaking { paused: false }, Some(utterance)) => {
                self.state = SynthesisState::Speaking { paused: true };
                effects.push(SideEffect::PauseSpeech { utterance });
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self, effects: &mut Vec<SideEffect>) -> bool {
        match (self.state, self.utterance) {
            (SynthesisState::Speaking { paused: true }, Some(utterance)) => {
                self.state = SynthesisState::Speaking { paused: false };
                effects.push(SideEffect::ResumeSpeech { utterance });
                true
            }
            _ => false,
        }
    }

    /// Stop playback silently.
    pub fn cancel(&mut self, effects: &mut Vec<SideEffect>) {
        if let Some(utterance) = self.utterance.take() {
            effects.push(SideEffect::CancelSpeech { utterance });
        }
        self.agenda = None;
        if self.is_speaking() {
            self.state = SynthesisState::Ready;
        }
    }

    /// Stop playback and report it as finished.
    pub fn skip(&mut self, effects: &mut Vec<SideEffect>) -> Option<SynthesisOutcome> {
        if !self.is_speaking() {
            return None;
        }
        self.cancel(effects);
        Some(SynthesisOutcome::Complete)
    }

    pub fn reset(&mut self, effects: &mut Vec<SideEffect>) {
        self.cancel(effects);
        self.voice = None;
        self.state = SynthesisState::Uninitialized;
    }

    pub fn on_signal(&mut self, signal: SynthesisSignal, effects: &mut Vec<SideEffect>) -> Option<SynthesisOutcome> {
        match signal {
            SynthesisSignal::Ready { voice } => {
                if self.state != SynthesisState::Initializing {
                    debug!(state = ?self.state, "unexpected synthesizer ready");
                    return None;
                }
                self.voice = Some(voice);
                self.state = SynthesisState::Ready;
                Some(SynthesisOutcome::Ready)
            }
            SynthesisSignal::Failed(reason) => {
                if self.state == SynthesisState::Fail {
                    return None;
                }
                self.cancel(effects);
                self.state = SynthesisState::Fail;
                Some(SynthesisOutcome::Error(reason))
            }
            SynthesisSignal::Started { utterance } => {
                if self.owns(utterance) {
                    Some(SynthesisOutcome::Started)
                } else {
                    None
                }
            }
            SynthesisSignal::Ended { utterance } => {
                if !self.owns(utterance) {
                    return None;
                }
                self.utterance = None;
                self.agenda = None;
                self.state = SynthesisState::Ready;
                Some(SynthesisOutcome::Complete)
            }
        }
    }

    fn owns(&self, utterance: UtteranceId) -> bool {
        let live = self.is_speaking() && self.utterance == Some(utterance);
        if !live {
            debug!(?utterance, current = ?self.utterance, "stale synthesis signal");
        }
        live
    }
}
