use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::kernel::event::{CaptureId, ControlCommand, Event, RecognitionSignal, SynthesisSignal, UtteranceId};
use crate::services::dialogue::{Alternative, Hypothesis};

use super::{EventSink, Recognizer, SpeechError, Synthesizer};

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Command(ControlCommand),
    Utterance(String),
    Quit,
    Unknown(String),
    Empty,
}

/// `:word [argument]` lines are control commands, anything else is speech.
pub fn parse_console_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return ConsoleInput::Utterance(line.to_string());
    };

    let (word, argument) = match command.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (command, ""),
    };
    match (word, argument) {
        ("prepare", _) => ConsoleInput::Command(ControlCommand::Prepare),
        ("start", _) => ConsoleInput::Command(ControlCommand::Start),
        ("stop", _) => ConsoleInput::Command(ControlCommand::Stop),
        ("pause", _) => ConsoleInput::Command(ControlCommand::Pause),
        ("click", _) => ConsoleInput::Command(ControlCommand::Click),
        ("page", segment) if !segment.is_empty() => {
            ConsoleInput::Command(ControlCommand::TurnPage(segment.to_string()))
        }
        ("select", expression) if !expression.is_empty() => {
            ConsoleInput::Command(ControlCommand::Select(Alternative::new(expression)))
        }
        ("quit", _) | ("exit", _) => ConsoleInput::Quit,
        _ => ConsoleInput::Unknown(line.to_string()),
    }
}

/// Recognizer whose "microphone" is the console: typed lines become final results
/// for the capture that is live at the time.
pub struct ConsoleRecognizer {
    sink: EventSink,
    capture: watch::Sender<Option<CaptureId>>,
}

/// Producer half of [`ConsoleRecognizer`], handed to whoever reads the console.
#[derive(Clone)]
pub struct TranscriptFeed {
    sink: EventSink,
    capture: watch::Receiver<Option<CaptureId>>,
}

impl ConsoleRecognizer {
    pub fn new(sink: EventSink) -> (Self, TranscriptFeed) {
        let (capture_tx, capture_rx) = watch::channel(None);
        let feed = TranscriptFeed {
            sink: sink.clone(),
            capture: capture_rx,
        };
        (Self { sink, capture: capture_tx }, feed)
    }

    fn post(&self, signal: RecognitionSignal) {
        if let Err(e) = self.sink.post(Event::Recognition(signal)) {
            warn!("Recognizer signal lost: {}", e);
        }
    }
}

impl Recognizer for ConsoleRecognizer {
    fn initialize(&mut self, locale: &str) {
        debug!("Console recognizer ready ({})", locale);
        self.post(RecognitionSignal::Ready);
    }

    fn start(&mut self, capture: CaptureId, _locale: &str, hints: &[String]) {
        if !hints.is_empty() {
            println!("   (hints: {})", hints.join(", "));
        }
        self.capture.send_replace(Some(capture));
        self.post(RecognitionSignal::Started { capture });
    }

    fn abort(&mut self, capture: CaptureId) {
        self.capture.send_if_modified(|live| {
            if *live == Some(capture) {
                *live = None;
                true
            } else {
                false
            }
        });
    }
}

impl TranscriptFeed {
    pub fn is_listening(&self) -> bool {
        self.capture.borrow().is_some()
    }

    /// Returns false when nothing is listening and the line was dropped.
    pub fn submit(&self, text: &str) -> Result<bool, SpeechError> {
        let text = text.trim();
        let capture = *self.capture.borrow();
        let Some(capture) = capture else {
            return Ok(false);
        };
        if text.is_empty() {
            return Ok(false);
        }

        self.sink.post(Event::Recognition(RecognitionSignal::Partial { capture }))?;
        self.sink.post(Event::Recognition(RecognitionSignal::Final {
            capture,
            hypotheses: vec![Hypothesis::new(text, 1.0)],
        }))?;
        Ok(true)
    }
}

struct Playback {
    utterance: UtteranceId,
    paused: watch::Sender<bool>,
    cancel: CancellationToken,
}

/// Prints prompts and holds the floor for a reading-time estimate.
pub struct ConsoleSynthesizer {
    sink: EventSink,
    per_word: Duration,
    playback: Option<Playback>,
}

impl ConsoleSynthesizer {
    pub fn new(sink: EventSink, per_word: Duration) -> Self {
        Self {
            sink,
            per_word,
            playback: None,
        }
    }

    fn playback_for(&self, utterance: UtteranceId) -> Option<&Playback> {
        self.playback.as_ref().filter(|playback| playback.utterance == utterance)
    }
}

impl Synthesizer for ConsoleSynthesizer {
    fn initialize(&mut self, voice: &str) {
        if let Err(e) = self.sink.post(Event::Synthesis(SynthesisSignal::Ready { voice: voice.to_string() })) {
            warn!("Synthesizer signal lost: {}", e);
        }
    }

    fn speak(&mut self, utterance: UtteranceId, text: &str) {
        if let Some(previous) = self.playback.take() {
            previous.cancel.cancel();
        }

        println!("S> {}", text);
        let words = text.split_whitespace().count() as u32;
        let total = self.per_word * words.max(1);

        let (paused_tx, paused_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        self.playback = Some(Playback {
            utterance,
            paused: paused_tx,
            cancel: cancel.clone(),
        });

        let sink = self.sink.clone();
        tokio::spawn(async move {
            if sink.send(Event::Synthesis(SynthesisSignal::Started { utterance })).await.is_err() {
                return;
            }
            if play(total, paused_rx, cancel).await {
                let _ = sink.send(Event::Synthesis(SynthesisSignal::Ended { utterance })).await;
            }
        });
    }

    fn pause(&mut self, utterance: UtteranceId) {
        if let Some(playback) = self.playback_for(utterance) {
            playback.paused.send_replace(true);
        }
    }

    fn resume(&mut self, utterance: UtteranceId) {
        if let Some(playback) = self.playback_for(utterance) {
            playback.paused.send_replace(false);
        }
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        if self.playback_for(utterance).is_some() {
            if let Some(playback) = self.playback.take() {
                playback.cancel.cancel();
            }
        }
    }
}

/// Sleep for `total` of unpaused time. False when cancelled.
async fn play(total: Duration, mut paused: watch::Receiver<bool>, cancel: CancellationToken) -> bool {
    let mut remaining = total;
    loop {
        if *paused.borrow_and_update() {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    continue;
                }
            }
        }

        let resumed_at = Instant::now();
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(remaining) => return true,
            changed = paused.changed() => {
                if changed.is_err() {
                    return false;
                }
                remaining = remaining.saturating_sub(resumed_at.elapsed());
            }
        }
    }
}
