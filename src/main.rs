//! voice-controller-daemon: console host for the voice controller
//!
//! Runs the controller with console engines:
//! - An empty line taps to speak; the next line is what the microphone heard
//! - `/stop` closes the open session
//! - Utterances are printed, paced like speech
//! - An IPC server lets another process drive and observe the controller

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use voice_controller::collab::{LogNotifier, OfflineAnswerer, Screen};
use voice_controller::config::Config;
use voice_controller::engine::{ConsoleMicrophone, ConsoleRecognizer, ConsoleSynthesizer};
use voice_controller::ipc::Server;
use voice_controller::lifecycle::ShutdownSignal;
use voice_controller::{
    ControllerParts, ControllerSettings, VoiceController, VoiceEvent, VoiceHandle,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voice-controller-daemon starting"
    );

    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, language = %config.language, "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // Controller -> IPC subscribers and the console log
    let (event_tx, mut event_rx) = broadcast::channel::<VoiceEvent>(64);

    let recognizer = ConsoleRecognizer::new();
    let microphone = recognizer.microphone();

    let (mut controller, controller_rx) = VoiceController::new(
        ControllerParts {
            recognizer: Box::new(recognizer),
            synthesizer: Box::new(ConsoleSynthesizer::new(config.words_per_minute)),
            answerer: Arc::new(OfflineAnswerer),
            notifier: Arc::new(LogNotifier),
        },
        ControllerSettings::from(&config),
        event_tx,
    );

    let handle = controller.handle();
    handle.register_navigator(|screen: Screen| {
        println!("[screen] {}", screen.title());
    })?;

    let server = Server::new(&config.socket_path, handle.clone())?;

    info!("daemon initialized, press Enter to talk (/stop closes the microphone)");

    tokio::select! {
        _ = controller.run(controller_rx) => {
            info!("voice controller exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        result = read_console(handle, microphone) => {
            match result {
                Ok(()) => info!("console closed"),
                Err(e) => error!(?e, "console read error"),
            }
        }

        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => info!(%event, "voice event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "voice event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("voice event logger exited");
        }

        result = shutdown.wait() => {
            if let Err(e) = result {
                error!(?e, "signal handling failed");
            }
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");
    server.shutdown().await;
    info!("voice-controller-daemon stopped");

    Ok(())
}

/// What a console line means for the controller
#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput {
    /// Close the open session
    Stop,
    /// Hand the line to the open session
    Heard,
    /// Empty line with nothing listening: tap to speak
    Tap,
    /// Text typed while nothing is listening
    Ignored,
}

fn classify(line: &str, session_open: bool) -> ConsoleInput {
    let line = line.trim();
    if line == "/stop" {
        ConsoleInput::Stop
    } else if session_open {
        ConsoleInput::Heard
    } else if line.is_empty() {
        ConsoleInput::Tap
    } else {
        ConsoleInput::Ignored
    }
}

/// Feed stdin to the console microphone
async fn read_console(handle: VoiceHandle, microphone: ConsoleMicrophone) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match classify(&line, microphone.is_open()) {
            ConsoleInput::Stop => handle.stop_listening()?,
            ConsoleInput::Heard => {
                microphone.deliver(&line);
            }
            ConsoleInput::Tap => handle.start_listening()?,
            ConsoleInput::Ignored => {
                warn!(%line, "microphone is closed, line ignored (press Enter to talk)");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_line_taps_only_when_closed() {
        assert_eq!(classify("", false), ConsoleInput::Tap);
        assert_eq!(classify("  ", false), ConsoleInput::Tap);
        assert_eq!(classify("", true), ConsoleInput::Heard);
    }

    #[test]
    fn test_text_without_session_is_ignored() {
        assert_eq!(classify("go home", false), ConsoleInput::Ignored);
        assert_eq!(classify("go home", true), ConsoleInput::Heard);
    }

    #[test]
    fn test_stop_command_wins() {
        assert_eq!(classify(" /stop ", true), ConsoleInput::Stop);
        assert_eq!(classify("/stop", false), ConsoleInput::Stop);
    }
}
