use std::time::Duration;

use tokio::sync::mpsc;
use voicedm::kernel::event::{CaptureId, ControlCommand, Event, RecognitionSignal, SynthesisSignal, UtteranceId};
use voicedm::services::dialogue::{Alternative, Hypothesis};
use voicedm::speech::{
    parse_console_line, CommandSynthesizer, ConsoleInput, ConsoleRecognizer, ConsoleSynthesizer, EventSink,
    Recognizer, SpeechError, Synthesizer,
};

#[test]
fn test_parse_control_words() {
    assert_eq!(parse_console_line(":start"), ConsoleInput::Command(ControlCommand::Start));
    assert_eq!(parse_console_line("  :click  "), ConsoleInput::Command(ControlCommand::Click));
    assert_eq!(
        parse_console_line(":page chapter-2"),
        ConsoleInput::Command(ControlCommand::TurnPage("chapter-2".to_string()))
    );
    assert_eq!(
        parse_console_line(":select answer(tea)"),
        ConsoleInput::Command(ControlCommand::Select(Alternative::new("answer(tea)")))
    );
    assert_eq!(parse_console_line(":page"), ConsoleInput::Unknown(":page".to_string()));
    assert_eq!(parse_console_line(":quit"), ConsoleInput::Quit);
    assert_eq!(parse_console_line(""), ConsoleInput::Empty);
    assert_eq!(parse_console_line("a cup of tea"), ConsoleInput::Utterance("a cup of tea".to_string()));
}

#[tokio::test]
async fn test_transcript_feed_targets_the_live_capture() {
    let (tx, mut rx) = mpsc::channel(16);
    let (mut recognizer, feed) = ConsoleRecognizer::new(EventSink::new(tx));

    assert!(!feed.submit("too early").unwrap());

    recognizer.start(CaptureId(3), "en-US", &[]);
    assert!(feed.is_listening());
    assert!(feed.submit(" tea please ").unwrap());

    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event);
    }
    assert!(matches!(received[0], Event::Recognition(RecognitionSignal::Started { capture: CaptureId(3) })));
    assert!(matches!(received[1], Event::Recognition(RecognitionSignal::Partial { capture: CaptureId(3) })));
    match &received[2] {
        Event::Recognition(RecognitionSignal::Final { capture, hypotheses }) => {
            assert_eq!(*capture, CaptureId(3));
            assert_eq!(hypotheses, &vec![Hypothesis::new("tea please", 1.0)]);
        }
        other => panic!("unexpected event {:?}", other),
    }

    recognizer.abort(CaptureId(2));
    assert!(feed.is_listening(), "aborting an old capture leaves the live one alone");
    recognizer.abort(CaptureId(3));
    assert!(!feed.submit("after abort").unwrap());
}

#[tokio::test]
async fn test_console_synthesizer_ends_unless_cancelled() {
    let (tx, mut rx) = mpsc::channel(16);
    let mut synthesizer = ConsoleSynthesizer::new(EventSink::new(tx), Duration::from_millis(5));

    synthesizer.speak(UtteranceId(1), "two words");
    let started = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert!(matches!(started, Some(Event::Synthesis(SynthesisSignal::Started { utterance: UtteranceId(1) }))));
    let ended = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert!(matches!(ended, Some(Event::Synthesis(SynthesisSignal::Ended { utterance: UtteranceId(1) }))));

    synthesizer.speak(UtteranceId(2), "this one is cut short");
    let started = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert!(matches!(started, Some(Event::Synthesis(SynthesisSignal::Started { utterance: UtteranceId(2) }))));
    synthesizer.cancel(UtteranceId(2));
    assert!(tokio::time::timeout(Duration::from_millis(200), rx.recv()).await.is_err());
}

#[tokio::test]
async fn test_paused_playback_holds_the_floor() {
    let (tx, mut rx) = mpsc::channel(16);
    let mut synthesizer = ConsoleSynthesizer::new(EventSink::new(tx), Duration::from_millis(20));

    synthesizer.speak(UtteranceId(1), "hold");
    rx.recv().await;
    synthesizer.pause(UtteranceId(1));
    assert!(tokio::time::timeout(Duration::from_millis(120), rx.recv()).await.is_err());

    synthesizer.resume(UtteranceId(1));
    let ended = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert!(matches!(ended, Some(Event::Synthesis(SynthesisSignal::Ended { utterance: UtteranceId(1) }))));
}

#[test]
fn test_command_synthesizer_needs_a_program() {
    let (tx, _rx) = mpsc::channel(1);
    let sink = EventSink::new(tx);
    assert!(matches!(CommandSynthesizer::new(sink.clone(), "   "), Err(SpeechError::NoCommand)));

    let synthesizer = CommandSynthesizer::new(sink, "espeak -s 160").unwrap();
    assert_eq!(synthesizer.program(), "espeak");
}

#[tokio::test]
async fn test_command_synthesizer_reports_spawn_failure() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut synthesizer = CommandSynthesizer::new(EventSink::new(tx), "voicedm-no-such-program").unwrap();

    synthesizer.speak(UtteranceId(1), "hello");
    match rx.recv().await {
        Some(Event::Synthesis(SynthesisSignal::Failed(reason))) => assert!(reason.contains("voicedm-no-such-program")),
        other => panic!("unexpected event {:?}", other),
    }
}
