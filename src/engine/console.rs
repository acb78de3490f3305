//! Console-backed engines used by the daemon
//!
//! The recognizer takes its transcript from stdin lines handed over through a
//! [`ConsoleMicrophone`]. The synthesizer prints each utterance and holds it
//! for as long as reading it aloud would take.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::{
    EngineError, RecognitionErrorKind, RecognitionOptions, RecognizerSink, SpeechRecognizer,
    SpeechSynthesizer, SynthesisSink,
};

type ActiveSession = Arc<Mutex<Option<RecognizerSink>>>;

fn lock(active: &ActiveSession) -> MutexGuard<'_, Option<RecognizerSink>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Recognizer whose "speech" is the next line typed on the console
#[derive(Debug, Default)]
pub struct ConsoleRecognizer {
    active: ActiveSession,
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used by the stdin reader to deliver lines
    pub fn microphone(&self) -> ConsoleMicrophone {
        ConsoleMicrophone {
            active: Arc::clone(&self.active),
        }
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(
        &mut self,
        options: &RecognitionOptions,
        sink: RecognizerSink,
    ) -> Result<(), EngineError> {
        let mut active = lock(&self.active);
        if active.is_some() {
            return Err(EngineError::AlreadyActive);
        }
        println!("[mic] listening ({}), type what you say:", options.language);
        sink.started();
        *active = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = lock(&self.active).take() {
            debug!(session = %sink.session(), "console recognizer aborted");
            sink.error(RecognitionErrorKind::Aborted);
            sink.ended();
        }
    }
}

/// Feeds console lines into the open recognition session
#[derive(Debug, Clone)]
pub struct ConsoleMicrophone {
    active: ActiveSession,
}

impl ConsoleMicrophone {
    /// Whether a session is waiting for a line
    pub fn is_open(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Deliver a typed line to the open session, closing it.
    /// Returns false when nothing is listening.
    pub fn deliver(&self, line: &str) -> bool {
        let Some(sink) = lock(&self.active).take() else {
            return false;
        };
        let text = line.trim();
        if text.is_empty() {
            sink.error(RecognitionErrorKind::NoSpeech);
        } else {
            sink.result(text);
        }
        sink.ended();
        true
    }
}

/// Synthesizer that prints utterances, paced like speech
#[derive(Debug)]
pub struct ConsoleSynthesizer {
    words_per_minute: u32,
    playing: Option<JoinHandle<()>>,
}

impl ConsoleSynthesizer {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            playing: None,
        }
    }

    /// How long reading `text` aloud takes at the configured pace
    pub fn duration_for(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        let millis = words * 60_000 / u64::from(self.words_per_minute);
        Duration::from_millis(millis.max(300))
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn speak(&mut self, text: &str, sink: SynthesisSink) {
        self.cancel_all();
        let pace = self.duration_for(text);
        let text = text.to_string();
        self.playing = Some(tokio::spawn(async move {
            sink.started();
            println!("[speaker] {}", text);
            tokio::time::sleep(pace).await;
            sink.ended();
        }));
    }

    fn cancel_all(&mut self) {
        if let Some(playing) = self.playing.take() {
            playing.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerEvent;
    use crate::engine::{RecognizerSignal, SessionId};
    use tokio::sync::mpsc;

    #[test]
    fn test_microphone_without_session() {
        let recognizer = ConsoleRecognizer::new();
        let mic = recognizer.microphone();
        assert!(!mic.is_open());
        assert!(!mic.deliver("hello"));
    }

    #[test]
    fn test_blank_line_is_no_speech() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recognizer = ConsoleRecognizer::new();
        let mic = recognizer.microphone();
        recognizer
            .start(
                &RecognitionOptions::single_shot("en-US"),
                RecognizerSink::new(SessionId(1), tx),
            )
            .unwrap();
        assert!(mic.is_open());
        assert!(mic.deliver("   "));

        let signals: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| match event {
                ControllerEvent::Recognizer(event) => event.signal,
                other => panic!("unexpected event: {:?}", other),
            })
            .collect();
        assert_eq!(
            signals,
            vec![
                RecognizerSignal::Started,
                RecognizerSignal::Error(RecognitionErrorKind::NoSpeech),
                RecognizerSignal::Ended,
            ]
        );
    }

    #[test]
    fn test_second_start_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut recognizer = ConsoleRecognizer::new();
        let options = RecognitionOptions::single_shot("en-US");
        recognizer
            .start(&options, RecognizerSink::new(SessionId(1), tx.clone()))
            .unwrap();
        let err = recognizer
            .start(&options, RecognizerSink::new(SessionId(2), tx))
            .unwrap_err();
        assert_eq!(err, EngineError::AlreadyActive);
    }

    #[test]
    fn test_speech_duration_has_a_floor() {
        let synth = ConsoleSynthesizer::new(120);
        assert_eq!(synth.duration_for("hi"), Duration::from_millis(500));
        assert_eq!(synth.duration_for(""), Duration::from_millis(300));
        assert_eq!(
            synth.duration_for("one two three four"),
            Duration::from_millis(2000)
        );
    }
}
