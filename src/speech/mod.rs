//! Speech provider bindings.
//!
//! Adapters never block the reactor: every method returns immediately and the
//! provider reports back through the kernel inbox as typed signals.

pub mod console;
pub mod say;

use tokio::sync::mpsc;

use crate::kernel::event::{CaptureId, Event, UtteranceId};

pub use console::{parse_console_line, ConsoleInput, ConsoleRecognizer, ConsoleSynthesizer, TranscriptFeed};
pub use say::CommandSynthesizer;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("kernel inbox closed")]
    InboxClosed,

    #[error("kernel inbox full")]
    InboxFull,

    #[error("no synthesizer command configured")]
    NoCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait Recognizer: Send {
    fn initialize(&mut self, locale: &str);
    fn start(&mut self, capture: CaptureId, locale: &str, hints: &[String]);
    fn abort(&mut self, capture: CaptureId);
}

pub trait Synthesizer: Send {
    fn initialize(&mut self, voice: &str);
    fn speak(&mut self, utterance: UtteranceId, text: &str);
    fn pause(&mut self, utterance: UtteranceId);
    fn resume(&mut self, utterance: UtteranceId);
    fn cancel(&mut self, utterance: UtteranceId);
}

/// Cloneable handle adapters use to post signals into the kernel inbox.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Non-blocking post, for use from adapter methods called by the reactor.
    pub fn post(&self, event: Event) -> Result<(), SpeechError> {
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SpeechError::InboxFull,
            mpsc::error::TrySendError::Closed(_) => SpeechError::InboxClosed,
        })
    }

    /// Ordered post from a spawned task.
    pub async fn send(&self, event: Event) -> Result<(), SpeechError> {
        self.tx.send(event).await.map_err(|_| SpeechError::InboxClosed)
    }
}
