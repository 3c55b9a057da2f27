use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::services::dialogue::{
    Alternative, CallFailure, CallKind, DialogueRequest, DialogueTurnResult, FailureClass, Hypothesis, Session,
};

use super::asr::{ListenParams, RecognitionActor, RecognitionOutcome, RecognitionState};
use super::effect::SideEffect;
use super::event::{CallId, ControlCommand, Event, RecognitionSignal, SynthesisSignal};
use super::telemetry::{BargeInKind, CallOutcome, TelemetryEvent, TelemetryRecorder};
use super::timer::{TimerHandle, TimerName, TimerRegistry};
use super::tts::{SynthesisActor, SynthesisOutcome, SynthesisState};
use super::view::{Activity, Phase, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStage {
    /// Nothing new to say yet; a dialogue call will deliver it.
    AwaitingResult,
    Speaking,
}

/// Who holds the floor while a conversation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacency {
    Prompt(PromptStage),
    /// Prompt finished; waiting for the in-flight call before deciding.
    WaitForDialogueCalls,
    Ask,
}

/// The request currently outstanding on the dialogue server, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueCalls {
    Start,
    Idle,
    NlInput,
    Passivity,
    Haptic,
}

/// Events the supervisor raises for itself and handles before the step returns.
#[derive(Debug, Clone, PartialEq)]
enum Raised {
    SpeechComplete,
    Recognised(Vec<Hypothesis>),
    NoInput,
}

/// The turn-taking state machine.
///
/// Pure: every call to [`Supervisor::handle`] consumes one event and returns the
/// side effects the driver must perform. Microphone and speaker are mutually
/// exclusive by construction: speech only starts in `Prompt`, capture only in
/// `Ask`, and at most one dialogue call is ever outstanding.
#[derive(Debug)]
pub struct Supervisor {
    phase: Phase,
    adjacency: Option<Adjacency>,
    calls: DialogueCalls,
    settings: Option<Settings>,

    result: Option<DialogueTurnResult>,
    result_version: u64,
    spoken_version: u64,

    requested_segment: Option<String>,
    default_segment: Option<String>,
    last_hypotheses: Vec<Hypothesis>,

    in_flight: Option<(CallId, CallKind)>,
    next_call: u64,

    asr: RecognitionActor,
    tts: SynthesisActor,
    timers: TimerRegistry,
    telemetry: TelemetryRecorder,

    status: Status,
    raised: VecDeque<Raised>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            phase: Phase::BeforeSetup,
            adjacency: None,
            calls: DialogueCalls::Idle,
            settings: None,
            result: None,
            result_version: 0,
            spoken_version: 0,
            requested_segment: None,
            default_segment: None,
            last_hypotheses: Vec::new(),
            in_flight: None,
            next_call: 0,
            asr: RecognitionActor::new(),
            tts: SynthesisActor::new(),
            timers: TimerRegistry::new(),
            telemetry: TelemetryRecorder::new(),
            status: Status::default(),
            raised: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn adjacency(&self) -> Option<Adjacency> {
        self.adjacency
    }

    pub fn calls(&self) -> DialogueCalls {
        self.calls
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub fn result(&self) -> Option<&DialogueTurnResult> {
        self.result.as_ref()
    }

    /// The page explicitly requested, else the server's first topic.
    pub fn segment(&self) -> Option<&str> {
        self.requested_segment
            .as_deref()
            .or(self.default_segment.as_deref())
    }

    pub fn last_hypotheses(&self) -> &[Hypothesis] {
        &self.last_hypotheses
    }

    pub fn in_flight(&self) -> Option<CallId> {
        self.in_flight.map(|(call, _)| call)
    }

    pub fn recognition_state(&self) -> RecognitionState {
        self.asr.state()
    }

    pub fn synthesis_state(&self) -> SynthesisState {
        self.tts.state()
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Run one event to completion, including everything it raises internally.
    pub fn handle(&mut self, event: Event) -> Vec<SideEffect> {
        let mut effects = Vec::new();

        match event {
            Event::Control(command) => self.on_control(command, &mut effects),
            Event::Recognition(signal) => self.on_recognition(signal, &mut effects),
            Event::Synthesis(signal) => self.on_synthesis(signal, &mut effects),
            Event::DialogueReply { call, outcome } => self.on_reply(call, outcome, &mut effects),
            Event::TimerFired(handle) => self.on_timer(handle, &mut effects),
        }

        while let Some(raised) = self.raised.pop_front() {
            self.on_raised(raised, &mut effects);
        }

        self.publish_status(&mut effects);
        effects
    }

    // ---- control surface ----

    fn on_control(&mut self, command: ControlCommand, effects: &mut Vec<SideEffect>) {
        match command {
            ControlCommand::Setup(settings) => self.setup(*settings, effects),
            ControlCommand::Prepare => self.prepare(effects),
            ControlCommand::Start => self.start(effects),
            ControlCommand::Stop => self.stop(effects),
            ControlCommand::TurnPage(segment) => {
                info!("Page turned to {}", segment);
                self.requested_segment = Some(segment);
            }
            ControlCommand::Click => self.click(effects),
            ControlCommand::Pause => self.pause(effects),
            ControlCommand::Select(alternative) => self.select(alternative, effects),
        }
    }

    fn setup(&mut self, settings: Settings, effects: &mut Vec<SideEffect>) {
        if !self.phase.accepts_setup() {
            debug!(phase = ?self.phase, "SETUP ignored");
            return;
        }

        self.halt(effects);
        self.asr.reset(&mut self.timers, effects);
        self.tts.reset(effects);
        self.result = None;
        self.result_version = 0;
        self.spoken_version = 0;
        self.default_segment = None;
        self.last_hypotheses.clear();

        let request = DialogueRequest::StartSession {
            device_id: settings.device_id.clone(),
            extra: settings.session_extra.clone(),
        };
        self.settings = Some(settings);
        self.transition(Phase::GetPages);
        self.issue(request, effects);
    }

    fn prepare(&mut self, effects: &mut Vec<SideEffect>) {
        if self.phase != Phase::BeforePrepare {
            debug!(phase = ?self.phase, "PREPARE ignored");
            return;
        }
        let Some(settings) = self.settings.as_ref() else {
            return;
        };
        let locale = settings.locale.clone();
        let voice = settings.voice.clone();

        self.transition(Phase::Prepare);
        self.asr.initialize(&locale, effects);
        self.tts.initialize(&voice, effects);
        self.check_prepared();
    }

    fn check_prepared(&mut self) {
        if self.phase == Phase::Prepare && self.asr.is_ready() && self.tts.is_ready() {
            self.transition(Phase::Idle);
        }
    }

    fn start(&mut self, effects: &mut Vec<SideEffect>) {
        if !self.phase.can_start() {
            debug!(phase = ?self.phase, "START ignored");
            return;
        }
        if !(self.asr.is_ready() && self.tts.is_ready()) {
            debug!("START ignored: speech providers not prepared");
            return;
        }
        let Some(settings) = self.settings.as_ref() else {
            return;
        };

        let from = self.phase;
        let segment = self.segment().map(str::to_string);
        let session = self.session();

        let request = match (from, segment) {
            (Phase::Stopped, Some(segment)) => Some(DialogueRequest::StartSessionWithSegment {
                device_id: settings.device_id.clone(),
                extra: settings.session_extra.clone(),
                segment,
            }),
            (Phase::Stopped, None) => Some(DialogueRequest::StartSession {
                device_id: settings.device_id.clone(),
                extra: settings.session_extra.clone(),
            }),
            (_, Some(segment)) => Some(DialogueRequest::SelectSegment { session, segment }),
            (_, None) => None,
        };

        self.transition(Phase::Active);
        if from == Phase::Stopped {
            // A fresh session supersedes whatever the old one had left to say.
            self.spoken_version = self.result_version;
        }

        match request {
            Some(request) => {
                self.calls = DialogueCalls::Start;
                self.issue(request, effects);
                self.enter_prompt(effects);
            }
            None if self.has_unspoken_result() => {
                self.calls = DialogueCalls::Idle;
                self.enter_prompt(effects);
            }
            None => {
                // Nothing left to say and no segment to select: nudge the server.
                self.calls = DialogueCalls::Idle;
                self.enter_prompt(effects);
                self.raised.push_back(Raised::NoInput);
            }
        }
    }

    fn stop(&mut self, effects: &mut Vec<SideEffect>) {
        if self.phase == Phase::Stopped {
            debug!(phase = ?self.phase, "STOP ignored");
            return;
        }
        self.halt(effects);
        self.transition(Phase::Stopped);
    }

    fn click(&mut self, effects: &mut Vec<SideEffect>) {
        if self.phase.can_start() {
            self.start(effects);
            return;
        }
        if self.phase != Phase::Active {
            debug!(phase = ?self.phase, "CLICK ignored");
            return;
        }

        match self.tts.state() {
            SynthesisState::Speaking { paused: true } => {
                self.tts.resume(effects);
                self.record_barge_in(BargeInKind::ResumeSpeech);
                return;
            }
            SynthesisState::Speaking { paused: false } => {
                if self.click_to_skip() {
                    if let Some(SynthesisOutcome::Complete) = self.tts.skip(effects) {
                        self.record_barge_in(BargeInKind::SkipSpeech);
                        self.raised.push_back(Raised::SpeechComplete);
                    }
                } else if self.tts.pause(effects) {
                    self.record_barge_in(BargeInKind::PauseSpeech);
                }
                return;
            }
            _ => {}
        }

        match self.asr.state() {
            RecognitionState::Listening(_) => {
                if self.asr.pause(&mut self.timers, effects) {
                    self.record_barge_in(BargeInKind::PauseListening);
                }
            }
            RecognitionState::Paused if self.adjacency == Some(Adjacency::Ask) => {
                let params = self.resume_params();
                if self.asr.start(params, &mut self.timers, effects) {
                    self.record_barge_in(BargeInKind::ResumeListening);
                }
            }
            state => debug!(?state, "CLICK ignored by recognizer"),
        }
    }

    fn pause(&mut self, effects: &mut Vec<SideEffect>) {
        if self.phase != Phase::Active {
            debug!(phase = ?self.phase, "PAUSE ignored");
            return;
        }
        if self.tts.pause(effects) {
            self.record_barge_in(BargeInKind::PauseSpeech);
        } else if self.asr.pause(&mut self.timers, effects) {
            self.record_barge_in(BargeInKind::PauseListening);
        }
    }

    fn select(&mut self, alternative: Alternative, effects: &mut Vec<SideEffect>) {
        if self.phase != Phase::Active || self.calls != DialogueCalls::Idle {
            debug!(phase = ?self.phase, calls = ?self.calls, "SELECT ignored");
            return;
        }
        info!("U> [{}]", alternative.caption().unwrap_or(alternative.semantic_expression.as_str()));

        self.tts.cancel(effects);
        self.asr.stop(&mut self.timers, effects);
        self.timers.cancel(TimerName::PassivityRetry, effects);
        self.record_barge_in(BargeInKind::Selection);

        // The selection answers the current prompt, spoken or not.
        self.spoken_version = self.result_version;
        let session = self.session();
        self.calls = DialogueCalls::Haptic;
        self.issue(DialogueRequest::SubmitSelection { session, alternative }, effects);
        self.enter_prompt(effects);
    }

    // ---- speech providers ----

    fn on_recognition(&mut self, signal: RecognitionSignal, effects: &mut Vec<SideEffect>) {
        if let Some(outcome) = self.asr.on_signal(signal, &mut self.timers, effects) {
            self.on_recognition_outcome(outcome, effects);
        }
    }

    fn on_recognition_outcome(&mut self, outcome: RecognitionOutcome, effects: &mut Vec<SideEffect>) {
        match outcome {
            RecognitionOutcome::Ready => self.check_prepared(),
            RecognitionOutcome::Started => debug!("Listening"),
            RecognitionOutcome::Recognised(hypotheses) => self.raised.push_back(Raised::Recognised(hypotheses)),
            RecognitionOutcome::NoInput => self.raised.push_back(Raised::NoInput),
            RecognitionOutcome::Error(reason) => {
                error!("Speech recognition failed: {}", reason);
                self.fail(effects);
            }
        }
    }

    fn on_synthesis(&mut self, signal: SynthesisSignal, effects: &mut Vec<SideEffect>) {
        match self.tts.on_signal(signal, effects) {
            Some(SynthesisOutcome::Ready) => self.check_prepared(),
            Some(SynthesisOutcome::Started) => debug!("Speaking"),
            Some(SynthesisOutcome::Complete) => self.raised.push_back(Raised::SpeechComplete),
            Some(SynthesisOutcome::Error(reason)) => {
                error!("Speech synthesis failed: {}", reason);
                self.fail(effects);
            }
            None => {}
        }
    }

    fn on_timer(&mut self, handle: TimerHandle, effects: &mut Vec<SideEffect>) {
        if !self.timers.fire(handle) {
            debug!(?handle, "Discarded stale timer");
            return;
        }
        match handle.name {
            TimerName::NoInput | TimerName::CompleteTimeout => {
                if let Some(outcome) = self.asr.on_timer(handle.name, &mut self.timers, effects) {
                    self.on_recognition_outcome(outcome, effects);
                }
            }
            TimerName::PassivityRetry => self.raised.push_back(Raised::NoInput),
        }
    }

    // ---- dialogue calls ----

    fn issue(&mut self, request: DialogueRequest, effects: &mut Vec<SideEffect>) {
        self.next_call += 1;
        let call = CallId(self.next_call);
        let kind = request.kind();
        debug!(?call, ?kind, "Dialogue call issued");
        self.in_flight = Some((call, kind));
        effects.push(SideEffect::CallDialogue { call, request });
    }

    fn on_reply(&mut self, call: CallId, outcome: Result<DialogueTurnResult, CallFailure>, effects: &mut Vec<SideEffect>) {
        let kind = match self.in_flight {
            Some((live, kind)) if live == call => kind,
            _ => {
                debug!("Discarded stale reply: call {:?} vs live {:?}", call, self.in_flight());
                self.telemetry.record(TelemetryEvent::StaleReply);
                return;
            }
        };
        self.in_flight = None;

        let result = match outcome {
            Ok(result) => result,
            Err(failure) => {
                match failure.class {
                    FailureClass::Transport => warn!("Dialogue call {:?} failed in transport: {}", kind, failure.message),
                    FailureClass::Protocol => error!("Dialogue call {:?} broke protocol: {}", kind, failure.message),
                }
                self.telemetry.record(TelemetryEvent::DialogueCall {
                    kind,
                    outcome: CallOutcome::Failed(failure.class),
                });
                self.fail(effects);
                return;
            }
        };

        self.telemetry.record(TelemetryEvent::DialogueCall { kind, outcome: CallOutcome::Landed });
        self.store_result(result);

        match self.phase {
            Phase::GetPages => {
                self.default_segment = self
                    .result
                    .as_ref()
                    .and_then(|result| result.available_topics.first().cloned());
                self.transition(Phase::BeforePrepare);
            }
            Phase::Active => {
                self.calls = DialogueCalls::Idle;
                match self.adjacency {
                    Some(Adjacency::Prompt(PromptStage::AwaitingResult)) => self.enter_prompt(effects),
                    Some(Adjacency::WaitForDialogueCalls) => self.join(effects),
                    other => debug!(adjacency = ?other, "Reply stored for the next prompt"),
                }
            }
            phase => debug!(?phase, "Reply stored outside a conversation"),
        }
    }

    fn store_result(&mut self, result: DialogueTurnResult) {
        self.result = Some(result);
        self.result_version += 1;
    }

    // ---- adjacency ----

    fn on_raised(&mut self, raised: Raised, effects: &mut Vec<SideEffect>) {
        if self.phase != Phase::Active {
            debug!(?raised, phase = ?self.phase, "Ignored outside a conversation");
            return;
        }
        match raised {
            Raised::SpeechComplete => {
                if self.adjacency != Some(Adjacency::Prompt(PromptStage::Speaking)) {
                    debug!(adjacency = ?self.adjacency, "SPEECH_COMPLETE ignored");
                    return;
                }
                self.adjacency = Some(Adjacency::WaitForDialogueCalls);
                if self.calls == DialogueCalls::Idle {
                    self.join(effects);
                }
            }
            Raised::Recognised(hypotheses) => {
                if self.adjacency != Some(Adjacency::Ask) || self.calls != DialogueCalls::Idle {
                    debug!(adjacency = ?self.adjacency, calls = ?self.calls, "RECOGNISED ignored");
                    return;
                }
                if let Some(top) = hypotheses.first() {
                    info!("U> {}", top.utterance);
                }
                self.telemetry.record(TelemetryEvent::Recognition { hypotheses: hypotheses.len() });
                self.last_hypotheses = hypotheses.clone();

                let (topic, moves) = self
                    .result
                    .as_ref()
                    .map(|result| (result.active_topic.clone(), result.moves.clone()))
                    .unwrap_or_default();
                let session = self.session();
                self.calls = DialogueCalls::NlInput;
                self.issue(DialogueRequest::SubmitUtterance { session, topic, moves, hypotheses }, effects);
                self.enter_prompt(effects);
            }
            Raised::NoInput => {
                let waiting = matches!(
                    self.adjacency,
                    Some(Adjacency::Ask) | Some(Adjacency::Prompt(PromptStage::AwaitingResult))
                );
                if !waiting || self.calls != DialogueCalls::Idle {
                    debug!(adjacency = ?self.adjacency, calls = ?self.calls, "NO_INPUT ignored");
                    return;
                }
                if self.adjacency == Some(Adjacency::Ask) {
                    self.telemetry.record(TelemetryEvent::NoInputTimeout);
                }
                let session = self.session();
                self.calls = DialogueCalls::Passivity;
                self.issue(DialogueRequest::PingPassivity { session }, effects);
                self.enter_prompt(effects);
            }
        }
    }

    /// Speak the current result if it is new, else wait for one to land.
    fn enter_prompt(&mut self, effects: &mut Vec<SideEffect>) {
        let utterance = match self.result.as_ref() {
            Some(result) if self.result_version > self.spoken_version => result.utterance.clone(),
            _ => {
                self.adjacency = Some(Adjacency::Prompt(PromptStage::AwaitingResult));
                return;
            }
        };

        self.spoken_version = self.result_version;
        self.adjacency = Some(Adjacency::Prompt(PromptStage::Speaking));
        if !utterance.trim().is_empty() {
            info!("S> {}", utterance);
        }
        if let Some(SynthesisOutcome::Complete) = self.tts.speak(&utterance, effects) {
            self.raised.push_back(Raised::SpeechComplete);
        }
    }

    /// Both regions have settled: decide what follows the prompt.
    fn join(&mut self, effects: &mut Vec<SideEffect>) {
        if self.has_unspoken_result() {
            self.enter_prompt(effects);
            return;
        }
        let Some(result) = self.result.as_ref() else {
            return;
        };

        if result.ends_conversation() {
            self.telemetry.record(TelemetryEvent::TurnCompleted { listened: false });
            self.end(effects);
            return;
        }

        if result.skips_listening() {
            self.telemetry.record(TelemetryEvent::TurnCompleted { listened: false });
            self.adjacency = Some(Adjacency::Prompt(PromptStage::AwaitingResult));
            let delay = self.settings.as_ref().map_or(0, |settings| settings.passivity_retry_delay_ms);
            if delay > 0 {
                self.timers.arm(TimerName::PassivityRetry, Duration::from_millis(delay), effects);
            } else {
                self.raised.push_back(Raised::NoInput);
            }
            return;
        }

        let params = ListenParams {
            no_input_timeout: result.expected_passivity_ms.map(Duration::from_millis),
            complete_timeout: self.complete_timeout(result),
            hints: result.asr_hints.clone(),
        };
        self.telemetry.record(TelemetryEvent::TurnCompleted { listened: true });
        self.adjacency = Some(Adjacency::Ask);
        self.asr.start(params, &mut self.timers, effects);
    }

    fn end(&mut self, effects: &mut Vec<SideEffect>) {
        self.tts.cancel(effects);
        self.asr.stop(&mut self.timers, effects);
        self.timers.cancel_all(effects);
        self.adjacency = None;
        self.calls = DialogueCalls::Idle;
        self.transition(Phase::End);
    }

    // ---- helpers ----

    /// Abort playback, capture, timers and the outstanding call.
    fn halt(&mut self, effects: &mut Vec<SideEffect>) {
        self.tts.cancel(effects);
        self.asr.stop(&mut self.timers, effects);
        self.timers.cancel_all(effects);
        if let Some((call, kind)) = self.in_flight.take() {
            debug!(?call, ?kind, "Dropping in-flight dialogue call");
        }
        self.adjacency = None;
        self.calls = DialogueCalls::Idle;
        self.raised.clear();
    }

    fn fail(&mut self, effects: &mut Vec<SideEffect>) {
        if self.phase == Phase::Fail {
            return;
        }
        self.halt(effects);
        self.transition(Phase::Fail);
    }

    fn transition(&mut self, to: Phase) {
        let from = self.phase;
        if from == to {
            return;
        }
        info!("Phase {:?} -> {:?}", from, to);
        self.phase = to;
        self.telemetry.record(TelemetryEvent::PhaseTransition { from, to });
    }

    fn has_unspoken_result(&self) -> bool {
        self.result.is_some() && self.result_version > self.spoken_version
    }

    fn session(&self) -> Session {
        self.result
            .as_ref()
            .map(|result| result.session.clone())
            .unwrap_or_default()
    }

    fn click_to_skip(&self) -> bool {
        self.settings.as_ref().is_some_and(|settings| settings.click_to_skip)
    }

    fn complete_timeout(&self, result: &DialogueTurnResult) -> Duration {
        let fallback = self
            .settings
            .as_ref()
            .map_or(0, |settings| settings.asr_default_complete_timeout_ms);
        let ms = if result.speech_complete_timeout_ms > 0 {
            result.speech_complete_timeout_ms
        } else {
            fallback
        };
        Duration::from_millis(ms)
    }

    /// Listening restarted by a click uses the configured no-input timeout.
    fn resume_params(&self) -> ListenParams {
        let no_input = self
            .settings
            .as_ref()
            .map_or(0, |settings| settings.asr_default_no_input_timeout_ms);
        match self.result.as_ref() {
            Some(result) => ListenParams {
                no_input_timeout: Some(Duration::from_millis(no_input)),
                complete_timeout: self.complete_timeout(result),
                hints: result.asr_hints.clone(),
            },
            None => ListenParams {
                no_input_timeout: Some(Duration::from_millis(no_input)),
                complete_timeout: Duration::ZERO,
                hints: Vec::new(),
            },
        }
    }

    fn record_barge_in(&mut self, kind: BargeInKind) {
        debug!(?kind, "Barge-in");
        self.telemetry.record(TelemetryEvent::BargeIn { kind });
    }

    fn activity(&self) -> Activity {
        match self.tts.state() {
            SynthesisState::Speaking { paused: true } => return Activity::SpeechPaused,
            SynthesisState::Speaking { paused: false } => return Activity::Speaking,
            _ => {}
        }
        match self.asr.state() {
            RecognitionState::Listening(_) => Activity::Listening,
            RecognitionState::Paused => Activity::ListeningPaused,
            _ if self.in_flight.is_some() => Activity::Waiting,
            _ => Activity::Idle,
        }
    }

    fn publish_status(&mut self, effects: &mut Vec<SideEffect>) {
        let status = Status {
            view: self.phase.view(),
            activity: self.activity(),
        };
        if status != self.status {
            self.status = status;
            effects.push(SideEffect::Publish(status));
        }
    }
}
