use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use voicedm::kernel::event::Event;
use voicedm::services::dialogue::DialogueClient;
use voicedm::speech::{
    parse_console_line, CommandSynthesizer, ConsoleInput, ConsoleRecognizer, ConsoleSynthesizer, EventSink,
    Synthesizer, TranscriptFeed,
};
use voicedm::{Reactor, Settings};

/// Reading pace of the console synthesizer.
const CONSOLE_WORD_MS: u64 = 250;

const HELP: &str = "Commands: :prepare :start :stop :pause :click :page <ddd> :select <expression> :quit\n\
                    Any other line is spoken input while the system is listening.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let settings_file = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_file.as_deref()).context("loading settings")?;
    settings.validate()?;
    info!("Dialogue server {} as {}", settings.endpoint, settings.device_id);

    let (tx, rx) = mpsc::channel(256);
    let sink = EventSink::new(tx.clone());

    let backend = Arc::new(DialogueClient::from_settings(&settings)?);
    let (recognizer, feed) = ConsoleRecognizer::new(sink.clone());
    let synthesizer: Box<dyn Synthesizer> = match settings.synthesizer_command.as_deref() {
        Some(command_line) => Box::new(CommandSynthesizer::new(sink.clone(), command_line)?),
        None => Box::new(ConsoleSynthesizer::new(sink, Duration::from_millis(CONSOLE_WORD_MS))),
    };

    let mut reactor = Reactor::new(rx, tx.clone(), backend, Box::new(recognizer), synthesizer);
    let shutdown = CancellationToken::new();

    let mut status = reactor.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            println!("[{} | {}]", current.view, current.activity);
        }
    });

    tokio::spawn(read_console(tx.clone(), feed, shutdown.clone()));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_shutdown.cancel();
        }
    });

    println!("{HELP}");
    tx.send(Event::setup(settings)).await.context("kernel inbox closed")?;
    reactor.run(shutdown).await;
    Ok(())
}

async fn read_console(tx: mpsc::Sender<Event>, feed: TranscriptFeed, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match parse_console_line(&line) {
            ConsoleInput::Empty => continue,
            ConsoleInput::Quit => break,
            ConsoleInput::Command(command) => {
                if let Err(e) = tx.send(Event::control(command)).await {
                    error!("Failed to send command: {}", e);
                    break;
                }
            }
            ConsoleInput::Utterance(text) => match feed.submit(&text) {
                Ok(true) => {}
                Ok(false) => println!("(not listening)"),
                Err(e) => {
                    error!("Failed to deliver input: {}", e);
                    break;
                }
            },
            ConsoleInput::Unknown(word) => println!("Unknown command {word}\n{HELP}"),
        }
    }

    shutdown.cancel();
}
