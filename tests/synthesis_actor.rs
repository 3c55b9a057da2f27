use voicedm::kernel::effect::SideEffect;
use voicedm::kernel::event::{SynthesisSignal, UtteranceId};
use voicedm::kernel::tts::{SynthesisActor, SynthesisOutcome, SynthesisState};

fn ready_actor() -> SynthesisActor {
    let mut actor = SynthesisActor::new();
    let mut fx = Vec::new();
    actor.initialize("en-US-DavisNeural", &mut fx);
    assert_eq!(fx, vec![SideEffect::InitSynthesizer { voice: "en-US-DavisNeural".to_string() }]);

    let outcome = actor.on_signal(SynthesisSignal::Ready { voice: "en-US-DavisNeural".to_string() }, &mut fx);
    assert_eq!(outcome, Some(SynthesisOutcome::Ready));
    assert_eq!(actor.voice(), Some("en-US-DavisNeural"));
    actor
}

fn speaking(text: &str) -> (SynthesisActor, UtteranceId) {
    let mut actor = ready_actor();
    let mut fx = Vec::new();
    assert!(actor.speak(text, &mut fx).is_none());
    let utterance = fx
        .iter()
        .find_map(|e| match e {
            SideEffect::Speak { utterance, .. } => Some(*utterance),
            _ => None,
        })
        .expect("speak effect");
    (actor, utterance)
}

#[test]
fn test_empty_agenda_completes_immediately() {
    let mut actor = ready_actor();
    let mut fx = Vec::new();

    assert_eq!(actor.speak("", &mut fx), Some(SynthesisOutcome::Complete));
    assert_eq!(actor.speak("   \n", &mut fx), Some(SynthesisOutcome::Complete));
    assert!(fx.is_empty());
    assert_eq!(actor.state(), SynthesisState::Ready);
}

#[test]
fn test_natural_end_completes() {
    let (mut actor, utterance) = speaking("Hello there");
    let mut fx = Vec::new();
    assert_eq!(actor.agenda(), Some("Hello there"));

    assert_eq!(actor.on_signal(SynthesisSignal::Started { utterance }, &mut fx), Some(SynthesisOutcome::Started));
    assert_eq!(actor.on_signal(SynthesisSignal::Ended { utterance }, &mut fx), Some(SynthesisOutcome::Complete));
    assert_eq!(actor.state(), SynthesisState::Ready);
    assert!(actor.agenda().is_none());
}

#[test]
fn test_pause_resume_toggle() {
    let (mut actor, utterance) = speaking("Hello there");
    let mut fx = Vec::new();

    assert!(actor.pause(&mut fx));
    assert!(!actor.pause(&mut fx));
    assert_eq!(actor.state(), SynthesisState::Speaking { paused: true });
    assert!(actor.resume(&mut fx));
    assert_eq!(actor.state(), SynthesisState::Speaking { paused: false });
    assert_eq!(
        fx,
        vec![SideEffect::PauseSpeech { utterance }, SideEffect::ResumeSpeech { utterance }]
    );
}

#[test]
fn test_cancel_is_silent_and_late_end_is_stale() {
    let (mut actor, utterance) = speaking("Hello there");
    let mut fx = Vec::new();

    actor.cancel(&mut fx);
    assert_eq!(fx, vec![SideEffect::CancelSpeech { utterance }]);
    assert_eq!(actor.state(), SynthesisState::Ready);
    assert!(actor.on_signal(SynthesisSignal::Ended { utterance }, &mut fx).is_none());
}

#[test]
fn test_skip_reports_completion() {
    let (mut actor, utterance) = speaking("A very long prompt");
    let mut fx = Vec::new();

    assert_eq!(actor.skip(&mut fx), Some(SynthesisOutcome::Complete));
    assert_eq!(fx, vec![SideEffect::CancelSpeech { utterance }]);
    assert!(actor.skip(&mut fx).is_none());
}

#[test]
fn test_new_speak_supersedes_old_utterance() {
    let (mut actor, first) = speaking("First");
    let mut fx = Vec::new();

    actor.speak("Second", &mut fx);
    assert_eq!(fx[0], SideEffect::CancelSpeech { utterance: first });
    assert!(actor.on_signal(SynthesisSignal::Ended { utterance: first }, &mut fx).is_none());
    assert!(actor.is_speaking());
}

#[test]
fn test_failure_is_terminal() {
    let (mut actor, _) = speaking("Hello");
    let mut fx = Vec::new();

    let outcome = actor.on_signal(SynthesisSignal::Failed("voice not found".to_string()), &mut fx);
    assert_eq!(outcome, Some(SynthesisOutcome::Error("voice not found".to_string())));
    assert_eq!(actor.state(), SynthesisState::Fail);
    assert!(actor.speak("again", &mut fx).is_none());
}
