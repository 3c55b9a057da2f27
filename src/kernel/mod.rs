//! The turn-taking kernel.
//!
//! Everything below [`reactor`] is pure: a step takes one [`event::Event`] and
//! returns [`effect::SideEffect`]s. Only the reactor awaits, spawns or talks to
//! providers.

pub mod asr;
pub mod effect;
pub mod event;
pub mod reactor;
pub mod supervisor;
pub mod telemetry;
pub mod timer;
pub mod tts;
pub mod view;

pub use effect::SideEffect;
pub use event::{CallId, CaptureId, ControlCommand, Event, RecognitionSignal, SynthesisSignal, UtteranceId};
pub use reactor::Reactor;
pub use supervisor::{Adjacency, DialogueCalls, PromptStage, Supervisor};
pub use view::{Activity, Phase, Status, View};
