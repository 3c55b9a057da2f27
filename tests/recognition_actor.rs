use std::time::Duration;

use voicedm::kernel::asr::{ListenParams, ListeningPhase, RecognitionActor, RecognitionOutcome, RecognitionState};
use voicedm::kernel::effect::SideEffect;
use voicedm::kernel::event::{CaptureId, RecognitionSignal};
use voicedm::kernel::timer::{TimerName, TimerRegistry};
use voicedm::services::dialogue::Hypothesis;

fn ready_actor() -> (RecognitionActor, TimerRegistry) {
    let mut actor = RecognitionActor::new();
    let mut timers = TimerRegistry::new();
    let mut fx = Vec::new();

    actor.initialize("en-US", &mut fx);
    assert_eq!(fx, vec![SideEffect::InitRecognizer { locale: "en-US".to_string() }]);
    assert_eq!(actor.state(), RecognitionState::Initializing);

    let outcome = actor.on_signal(RecognitionSignal::Ready, &mut timers, &mut fx);
    assert_eq!(outcome, Some(RecognitionOutcome::Ready));
    (actor, timers)
}

fn params(no_input_ms: Option<u64>) -> ListenParams {
    ListenParams {
        no_input_timeout: no_input_ms.map(Duration::from_millis),
        complete_timeout: Duration::from_millis(400),
        hints: vec!["coffee".to_string(), "tea".to_string()],
    }
}

fn started(no_input_ms: Option<u64>) -> (RecognitionActor, TimerRegistry, CaptureId) {
    let (mut actor, mut timers) = ready_actor();
    let mut fx = Vec::new();
    assert!(actor.start(params(no_input_ms), &mut timers, &mut fx));
    let capture = actor.capture().expect("capture started");
    (actor, timers, capture)
}

#[test]
fn test_start_arms_no_input_and_begins_capture() {
    let (mut actor, mut timers) = ready_actor();
    let mut fx = Vec::new();

    assert!(actor.start(params(Some(3000)), &mut timers, &mut fx));
    assert_eq!(actor.state(), RecognitionState::Listening(ListeningPhase::NoInput));
    assert!(timers.is_live(TimerName::NoInput));
    assert!(fx.iter().any(|e| matches!(
        e,
        SideEffect::StartCapture { locale, hints, .. } if locale == "en-US" && hints.len() == 2
    )));
}

#[test]
fn test_infinite_no_input_arms_nothing() {
    let (_actor, timers, _) = started(None);
    assert_eq!(timers.live_count(), 0);
}

#[test]
fn test_partial_cancels_no_input() {
    let (mut actor, mut timers, capture) = started(Some(3000));
    let mut fx = Vec::new();

    let outcome = actor.on_signal(RecognitionSignal::Partial { capture }, &mut timers, &mut fx);
    assert!(outcome.is_none());
    assert_eq!(actor.state(), RecognitionState::Listening(ListeningPhase::InProgress));
    assert!(!timers.is_live(TimerName::NoInput));
    assert!(fx.iter().any(|e| matches!(e, SideEffect::CancelTimer { handle } if handle.name == TimerName::NoInput)));
}

#[test]
fn test_later_final_replaces_pending_result() {
    let (mut actor, mut timers, capture) = started(None);
    let mut fx = Vec::new();

    actor.on_signal(
        RecognitionSignal::Final { capture, hypotheses: vec![Hypothesis::new("tea", 0.4)] },
        &mut timers,
        &mut fx,
    );
    let first = timers.is_live(TimerName::CompleteTimeout);
    actor.on_signal(
        RecognitionSignal::Final { capture, hypotheses: vec![Hypothesis::new("tea please", 0.8)] },
        &mut timers,
        &mut fx,
    );
    assert!(first);
    assert_eq!(timers.live_count(), 1, "re-arming leaves a single completion timer");

    let armed: Vec<_> = fx
        .iter()
        .filter_map(|e| match e {
            SideEffect::ArmTimer { handle, .. } if handle.name == TimerName::CompleteTimeout => Some(*handle),
            _ => None,
        })
        .collect();
    assert_eq!(armed.len(), 2);
    assert!(!timers.fire(armed[0]), "the superseded completion timer is dead");
    assert!(timers.fire(armed[1]));

    let outcome = actor.on_timer(TimerName::CompleteTimeout, &mut timers, &mut fx);
    assert_eq!(
        outcome,
        Some(RecognitionOutcome::Recognised(vec![Hypothesis::new("tea please", 0.8)]))
    );
    assert_eq!(actor.state(), RecognitionState::Ready);
}

#[test]
fn test_partial_after_final_holds_the_commit() {
    let (mut actor, mut timers, capture) = started(None);
    let mut fx = Vec::new();

    actor.on_signal(
        RecognitionSignal::Final { capture, hypotheses: vec![Hypothesis::new("I want", 0.5)] },
        &mut timers,
        &mut fx,
    );
    assert_eq!(actor.state(), RecognitionState::Listening(ListeningPhase::Matched));

    actor.on_signal(RecognitionSignal::Partial { capture }, &mut timers, &mut fx);
    assert_eq!(actor.state(), RecognitionState::Listening(ListeningPhase::Matched));
    assert!(timers.is_live(TimerName::CompleteTimeout), "a trailing interim keeps the commit armed");

    let outcome = actor.on_timer(TimerName::CompleteTimeout, &mut timers, &mut fx);
    assert_eq!(outcome, Some(RecognitionOutcome::Recognised(vec![Hypothesis::new("I want", 0.5)])));
    assert_eq!(actor.state(), RecognitionState::Ready);
    assert_eq!(timers.live_count(), 0);
}

#[test]
fn test_no_input_timeout_reports_and_stops_capture() {
    let (mut actor, mut timers, capture) = started(Some(3000));
    let mut fx = Vec::new();

    let outcome = actor.on_timer(TimerName::NoInput, &mut timers, &mut fx);
    assert_eq!(outcome, Some(RecognitionOutcome::NoInput));
    assert_eq!(actor.state(), RecognitionState::Ready);
    assert!(fx.contains(&SideEffect::AbortCapture { capture }));
}

#[test]
fn test_pause_then_start_resumes_with_new_capture() {
    let (mut actor, mut timers, capture) = started(Some(3000));
    let mut fx = Vec::new();

    assert!(actor.pause(&mut timers, &mut fx));
    assert_eq!(actor.state(), RecognitionState::Paused);
    assert_eq!(timers.live_count(), 0);
    assert!(fx.contains(&SideEffect::AbortCapture { capture }));

    assert!(actor.start(params(Some(5000)), &mut timers, &mut fx));
    let resumed = actor.capture().expect("resumed");
    assert_ne!(resumed, capture);

    let outcome = actor.on_signal(
        RecognitionSignal::Final { capture, hypotheses: vec![Hypothesis::new("late", 1.0)] },
        &mut timers,
        &mut fx,
    );
    assert!(outcome.is_none());
    assert_eq!(actor.state(), RecognitionState::Listening(ListeningPhase::NoInput));
}

#[test]
fn test_stop_is_silent() {
    let (mut actor, mut timers, capture) = started(Some(3000));
    let mut fx = Vec::new();

    actor.stop(&mut timers, &mut fx);
    assert_eq!(actor.state(), RecognitionState::Ready);
    assert_eq!(timers.live_count(), 0);
    assert!(fx.contains(&SideEffect::AbortCapture { capture }));
}

#[test]
fn test_provider_failure_is_terminal() {
    let (mut actor, mut timers, _) = started(Some(3000));
    let mut fx = Vec::new();

    let outcome = actor.on_signal(RecognitionSignal::Failed("device lost".to_string()), &mut timers, &mut fx);
    assert_eq!(outcome, Some(RecognitionOutcome::Error("device lost".to_string())));
    assert_eq!(actor.state(), RecognitionState::Fail);
    assert_eq!(timers.live_count(), 0);
    assert!(!actor.start(params(None), &mut timers, &mut fx));
}

#[test]
fn test_cannot_listen_before_ready() {
    let mut actor = RecognitionActor::new();
    let mut timers = TimerRegistry::new();
    let mut fx = Vec::new();
    assert!(!actor.start(params(None), &mut timers, &mut fx));
    assert!(fx.is_empty());
}
