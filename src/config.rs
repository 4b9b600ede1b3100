//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::interpreter::DEFAULT_WAKE_WORDS;
use crate::speech::VoiceSettings;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Assistant behavior, from `config.json` when present
    pub assistant: AssistantConfig,
}

/// Tunable assistant behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub wake_words: Vec<String>,
    /// Recognition locale handed to the recognizer
    pub language: String,
    /// Speak the introduction shortly after startup
    pub greet_on_start: bool,
    pub voice: VoiceSettings,
    pub timings: Timings,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_words: DEFAULT_WAKE_WORDS.iter().map(|w| w.to_string()).collect(),
            language: "en-US".to_string(),
            greet_on_start: true,
            voice: VoiceSettings::default(),
            timings: Timings::default(),
        }
    }
}

/// Controller timing constants, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Command-mode inactivity before going to sleep
    pub command_timeout_ms: u64,
    /// Minimum gap between two recognition starts
    pub min_restart_delay_ms: u64,
    /// Restart delay after a no-speech timeout in command mode
    pub no_speech_restart_delay_ms: u64,
    /// Consecutive rapid aborts tolerated before backing off
    pub max_abort_retries: u32,
    /// Two aborts closer than this count as consecutive
    pub abort_window_ms: u64,
    /// Back-off after too many rapid aborts
    pub abort_cooldown_ms: u64,
    /// Utterances and starts are suppressed this long after speech ends
    pub speech_cooldown_ms: u64,
    /// Extra wait after the speech cooldown before listening again
    pub restart_buffer_ms: u64,
    /// Status line reset after a reply
    pub status_reset_ms: u64,
    /// Delay before the startup greeting
    pub greeting_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            command_timeout_ms: 15_000,
            min_restart_delay_ms: 300,
            no_speech_restart_delay_ms: 500,
            max_abort_retries: 3,
            abort_window_ms: 1_000,
            abort_cooldown_ms: 2_000,
            speech_cooldown_ms: 1_500,
            restart_buffer_ms: 200,
            status_reset_ms: 2_000,
            greeting_delay_ms: 2_000,
        }
    }
}

impl Timings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn min_restart_delay(&self) -> Duration {
        Duration::from_millis(self.min_restart_delay_ms)
    }

    pub fn no_speech_restart_delay(&self) -> Duration {
        Duration::from_millis(self.no_speech_restart_delay_ms)
    }

    pub fn abort_window(&self) -> Duration {
        Duration::from_millis(self.abort_window_ms)
    }

    pub fn abort_cooldown(&self) -> Duration {
        Duration::from_millis(self.abort_cooldown_ms)
    }

    pub fn speech_cooldown(&self) -> Duration {
        Duration::from_millis(self.speech_cooldown_ms)
    }

    /// Delay from speech end until listening resumes
    pub fn post_speech_restart(&self) -> Duration {
        Duration::from_millis(self.speech_cooldown_ms + self.restart_buffer_ms)
    }

    pub fn status_reset(&self) -> Duration {
        Duration::from_millis(self.status_reset_ms)
    }

    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }
}

impl Config {
    /// Load configuration from environment and defaults
    ///
    /// `JARVIS_SOCKET` overrides the socket path and `JARVIS_CONFIG` points
    /// at an assistant config file; otherwise `<data_dir>/config.json` is used
    /// when it exists.
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("jarvis");

        let socket_path = std::env::var_os("JARVIS_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("jarvis.sock"));

        let assistant = match std::env::var_os("JARVIS_CONFIG") {
            Some(path) => AssistantConfig::from_file(Path::new(&path))?,
            None => {
                let default_path = data_dir.join("config.json");
                if default_path.exists() {
                    AssistantConfig::from_file(&default_path)?
                } else {
                    AssistantConfig::default()
                }
            }
        };

        Ok(Self {
            socket_path,
            data_dir,
            assistant,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

impl AssistantConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        Ok(config)
    }
}
