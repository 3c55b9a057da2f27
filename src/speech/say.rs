use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::kernel::event::{Event, SynthesisSignal, UtteranceId};

use super::{EventSink, SpeechError, Synthesizer};

struct Playing {
    utterance: UtteranceId,
    text: String,
    stop: Option<oneshot::Sender<()>>,
}

/// Speaks through an external program (`say`, `espeak`, ...), the text passed as
/// the last argument.
///
/// A process cannot be paused portably: pause kills it and resume speaks the
/// utterance again from the start.
pub struct CommandSynthesizer {
    sink: EventSink,
    program: String,
    args: Vec<String>,
    playing: Option<Playing>,
}

impl CommandSynthesizer {
    /// `command_line` is split on whitespace, e.g. `"espeak -s 160"`.
    pub fn new(sink: EventSink, command_line: &str) -> Result<Self, SpeechError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(SpeechError::NoCommand)?;
        Ok(Self {
            sink,
            program,
            args: parts.collect(),
            playing: None,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn post(&self, signal: SynthesisSignal) {
        if let Err(e) = self.sink.post(Event::Synthesis(signal)) {
            warn!("Synthesizer signal lost: {}", e);
        }
    }

    fn stop_process(&mut self) {
        if let Some(stop_tx) = self.playing.as_mut().and_then(|playing| playing.stop.take()) {
            let _ = stop_tx.send(());
        }
    }

    fn spawn(&mut self, utterance: UtteranceId, text: &str, announce: bool) -> Result<oneshot::Sender<()>, SpeechError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let sink = self.sink.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        tokio::spawn(async move {
            if announce && sink.send(Event::Synthesis(SynthesisSignal::Started { utterance })).await.is_err() {
                return;
            }

            tokio::select! {
                status = child.wait() => {
                    if let Err(e) = status {
                        warn!("Speech process failed: {}", e);
                    }
                    let _ = sink.send(Event::Synthesis(SynthesisSignal::Ended { utterance })).await;
                }
                _ = &mut stop_rx => {
                    let _ = child.kill().await;
                }
            }
        });
        Ok(stop_tx)
    }
}

impl Synthesizer for CommandSynthesizer {
    fn initialize(&mut self, voice: &str) {
        debug!("Speaking through '{}'", self.program);
        self.post(SynthesisSignal::Ready { voice: voice.to_string() });
    }

    fn speak(&mut self, utterance: UtteranceId, text: &str) {
        self.stop_process();
        self.playing = None;

        match self.spawn(utterance, text, true) {
            Ok(stop) => {
                self.playing = Some(Playing {
                    utterance,
                    text: text.to_string(),
                    stop: Some(stop),
                });
            }
            Err(e) => self.post(SynthesisSignal::Failed(e.to_string())),
        }
    }

    fn pause(&mut self, utterance: UtteranceId) {
        if self.playing.as_ref().is_some_and(|playing| playing.utterance == utterance) {
            self.stop_process();
        }
    }

    fn resume(&mut self, utterance: UtteranceId) {
        let text = match self.playing.as_ref() {
            Some(playing) if playing.utterance == utterance && playing.stop.is_none() => playing.text.clone(),
            _ => return,
        };
        match self.spawn(utterance, &text, false) {
            Ok(stop) => {
                if let Some(playing) = self.playing.as_mut() {
                    playing.stop = Some(stop);
                }
            }
            Err(e) => self.post(SynthesisSignal::Failed(e.to_string())),
        }
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        if self.playing.as_ref().is_some_and(|playing| playing.utterance == utterance) {
            self.stop_process();
            self.playing = None;
        }
    }
}
