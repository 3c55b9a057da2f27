use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::services::dialogue::{CallFailure, DialogueBackend};
use crate::speech::{Recognizer, Synthesizer};

use super::effect::SideEffect;
use super::event::Event;
use super::supervisor::Supervisor;
use super::timer::{TimerHandle, TimerName};
use super::view::Status;

/// Async driver around the pure [`Supervisor`].
///
/// Takes one event at a time from the inbox, runs the kernel step to completion
/// and executes the resulting side effects. Everything asynchronous (dialogue
/// calls, timers, providers) reports back through the same inbox.
pub struct Reactor {
    pub receiver: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    pub supervisor: Supervisor,
    backend: Arc<dyn DialogueBackend>,
    recognizer: Box<dyn Recognizer>,
    synthesizer: Box<dyn Synthesizer>,
    timers: HashMap<TimerName, (TimerHandle, JoinHandle<()>)>,
    status: watch::Sender<Status>,
}

impl Reactor {
    pub fn new(
        receiver: mpsc::Receiver<Event>,
        tx: mpsc::Sender<Event>,
        backend: Arc<dyn DialogueBackend>,
        recognizer: Box<dyn Recognizer>,
        synthesizer: Box<dyn Synthesizer>,
    ) -> Self {
        let (status, _) = watch::channel(Status::default());
        Self {
            receiver,
            tx,
            supervisor: Supervisor::new(),
            backend,
            recognizer,
            synthesizer,
            timers: HashMap::new(),
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    /// One kernel step plus its side effects. Never awaits.
    pub fn step(&mut self, event: Event) {
        let effects = self.supervisor.handle(event);
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: SideEffect) {
        match effect {
            SideEffect::InitRecognizer { locale } => self.recognizer.initialize(&locale),
            SideEffect::StartCapture { capture, locale, hints } => self.recognizer.start(capture, &locale, &hints),
            SideEffect::AbortCapture { capture } => self.recognizer.abort(capture),

            SideEffect::InitSynthesizer { voice } => self.synthesizer.initialize(&voice),
            SideEffect::Speak { utterance, text } => self.synthesizer.speak(utterance, &text),
            SideEffect::PauseSpeech { utterance } => self.synthesizer.pause(utterance),
            SideEffect::ResumeSpeech { utterance } => self.synthesizer.resume(utterance),
            SideEffect::CancelSpeech { utterance } => self.synthesizer.cancel(utterance),

            SideEffect::ArmTimer { handle, delay } => {
                let tx = self.tx.clone();
                let task = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Event::TimerFired(handle)).await;
                });
                if let Some((_, previous)) = self.timers.insert(handle.name, (handle, task)) {
                    previous.abort();
                }
            }
            SideEffect::CancelTimer { handle } => {
                if matches!(self.timers.get(&handle.name), Some((live, _)) if *live == handle) {
                    if let Some((_, task)) = self.timers.remove(&handle.name) {
                        task.abort();
                    }
                }
            }

            SideEffect::CallDialogue { call, request } => {
                let backend = Arc::clone(&self.backend);
                let tx = self.tx.clone();
                debug!(?call, kind = ?request.kind(), "Dispatching dialogue call");
                tokio::spawn(async move {
                    let outcome = backend.execute(request).await.map_err(CallFailure::from);
                    let _ = tx.send(Event::DialogueReply { call, outcome }).await;
                });
            }

            SideEffect::Publish(status) => {
                self.status.send_replace(status);
            }
        }
    }

    /// Drive the kernel until `shutdown` fires.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!("Reactor started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => self.step(event),
                    None => break,
                },
            }
        }

        for (_, (_, task)) in self.timers.drain() {
            task.abort();
        }
        info!("Reactor stopped");
    }
}
