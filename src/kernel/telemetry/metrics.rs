use std::collections::VecDeque;

use super::event::{BargeInKind, CallOutcome, TelemetryEvent};
use crate::kernel::view::Phase;
use crate::services::dialogue::{CallKind, FailureClass};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub call_stats: CallStats,
    pub turn_stats: TurnStats,
    pub barge_in_stats: BargeInStats,
    pub conversations_started: u64,
    pub conversations_ended: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStats {
    pub landed: u64,
    pub transport_failures: u64,
    pub protocol_failures: u64,
    pub utterances_submitted: u64,
    pub passivity_pings: u64,
    pub selections: u64,
    pub stale_replies: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnStats {
    pub completed: u64,
    pub listened: u64,
    pub recognitions: u64,
    pub no_input_timeouts: u64,
    pub avg_hypotheses: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BargeInStats {
    pub pauses: u64,
    pub resumes: u64,
    pub skips: u64,
    pub selections: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();
    let mut total_hypotheses = 0usize;

    for event in events {
        match event {
            TelemetryEvent::PhaseTransition { to, .. } => match to {
                Phase::Active => snap.conversations_started += 1,
                Phase::End => snap.conversations_ended += 1,
                Phase::Fail => snap.failures += 1,
                _ => {}
            },
            TelemetryEvent::DialogueCall { kind, outcome } => match outcome {
                CallOutcome::Landed => {
                    snap.call_stats.landed += 1;
                    match kind {
                        CallKind::NaturalLanguageInput => snap.call_stats.utterances_submitted += 1,
                        CallKind::Passivity => snap.call_stats.passivity_pings += 1,
                        CallKind::HapticInput => snap.call_stats.selections += 1,
                        CallKind::StartSession | CallKind::SelectSegment => {}
                    }
                }
                CallOutcome::Failed(FailureClass::Transport) => snap.call_stats.transport_failures += 1,
                CallOutcome::Failed(FailureClass::Protocol) => snap.call_stats.protocol_failures += 1,
            },
            TelemetryEvent::TurnCompleted { listened } => {
                snap.turn_stats.completed += 1;
                if *listened {
                    snap.turn_stats.listened += 1;
                }
            }
            TelemetryEvent::Recognition { hypotheses } => {
                snap.turn_stats.recognitions += 1;
                total_hypotheses += hypotheses;
            }
            TelemetryEvent::NoInputTimeout => snap.turn_stats.no_input_timeouts += 1,
            TelemetryEvent::BargeIn { kind } => match kind {
                BargeInKind::PauseSpeech | BargeInKind::PauseListening => snap.barge_in_stats.pauses += 1,
                BargeInKind::ResumeSpeech | BargeInKind::ResumeListening => snap.barge_in_stats.resumes += 1,
                BargeInKind::SkipSpeech => snap.barge_in_stats.skips += 1,
                BargeInKind::Selection => snap.barge_in_stats.selections += 1,
            },
            TelemetryEvent::StaleReply => snap.call_stats.stale_replies += 1,
        }
    }

    if snap.turn_stats.recognitions > 0 {
        snap.turn_stats.avg_hypotheses = total_hypotheses as f64 / snap.turn_stats.recognitions as f64;
    }

    snap
}
