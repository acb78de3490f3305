//! Configuration loading and management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Recognizer language tag
    pub language: String,

    /// Delay between cancelling speech and speaking again
    pub speak_delay: Duration,

    /// Backoff before retrying a failed utterance
    pub retry_backoff: Duration,

    /// Automatic retries per utterance (at most one)
    pub max_speech_retries: u8,

    /// Upper bound on an AI query; `None` waits indefinitely
    pub query_timeout: Option<Duration>,

    /// Pacing of the console synthesizer
    pub words_per_minute: u32,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        Self::from_lookup(&home, |key| std::env::var(key).ok())
    }

    fn from_lookup(home: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("voice-controller");

        let socket_path = data_dir.join("controller.sock");

        let number = |key: &str, default: u64| -> Result<u64> {
            parse_or(lookup(key), default).with_context(|| format!("invalid value for {}", key))
        };

        let query_timeout = match number("VOICE_QUERY_TIMEOUT_SECS", 30)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            socket_path,
            data_dir,
            language: lookup("VOICE_LANGUAGE").unwrap_or_else(|| "en-US".to_string()),
            speak_delay: Duration::from_millis(number("VOICE_SPEAK_DELAY_MS", 50)?),
            retry_backoff: Duration::from_millis(number("VOICE_RETRY_BACKOFF_MS", 100)?),
            max_speech_retries: number("VOICE_MAX_SPEECH_RETRIES", 1)?.min(1) as u8,
            query_timeout,
            words_per_minute: number("VOICE_WORDS_PER_MINUTE", 180)?.clamp(1, 1000) as u32,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> Result<T, T::Err> {
    match value {
        Some(raw) => raw.trim().parse(),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup("/home/tester", move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.socket_path.to_string_lossy().contains("voice-controller"));
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/tester/.local/share/voice-controller/controller.sock")
        );
        assert_eq!(config.language, "en-US");
        assert_eq!(config.speak_delay, Duration::from_millis(50));
        assert_eq!(config.retry_backoff, Duration::from_millis(100));
        assert_eq!(config.max_speech_retries, 1);
        assert_eq!(config.query_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides() {
        let config = load_with(&[
            ("VOICE_LANGUAGE", "en-GB"),
            ("VOICE_SPEAK_DELAY_MS", "0"),
            ("VOICE_MAX_SPEECH_RETRIES", "5"),
            ("VOICE_QUERY_TIMEOUT_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.language, "en-GB");
        assert_eq!(config.speak_delay, Duration::ZERO);
        assert_eq!(config.max_speech_retries, 1);
        assert_eq!(config.query_timeout, None);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = load_with(&[("VOICE_RETRY_BACKOFF_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("VOICE_RETRY_BACKOFF_MS"));
    }
}
