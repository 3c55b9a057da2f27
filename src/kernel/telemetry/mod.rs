//! Conversation telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside turn-taking decisions.
//! It exists solely for observability and verification.
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain user content (utterances, hypotheses, session data).
//! Only enums, ids and counts are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{BargeInKind, CallOutcome, TelemetryEvent};
pub use metrics::{compute_snapshot, TelemetrySnapshot};
pub use recorder::TelemetryRecorder;
