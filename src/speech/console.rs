//! Terminal speech backends
//!
//! Typed lines on stdin stand in for the microphone and spoken replies are
//! printed. Lines beginning with `!` inject recognizer errors
//! (`!no-speech`, `!aborted`, `!not-allowed`, ...).

use std::io::BufRead;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{Recognizer, Synthesizer};
use super::types::{
    ListenMode, RecognitionErrorKind, SessionId, SpeechError, SpeechEvent, Utterance, UtteranceId,
    VoiceSettings,
};

/// Playback time per word at rate 1.0
const WORD_DURATION: Duration = Duration::from_millis(320);

type ActiveSession = Arc<Mutex<Option<(SessionId, ListenMode)>>>;

/// Recognizer fed by stdin lines
pub struct ConsoleRecognizer {
    language: String,
    active: ActiveSession,
    event_tx: mpsc::UnboundedSender<SpeechEvent>,
}

impl ConsoleRecognizer {
    /// Create the recognizer and spawn the stdin reader thread
    pub fn spawn(
        language: String,
        event_tx: mpsc::UnboundedSender<SpeechEvent>,
    ) -> Result<Self, SpeechError> {
        let recognizer = Self::new(language, event_tx);

        let reader_active = Arc::clone(&recognizer.active);
        let reader_tx = recognizer.event_tx.clone();
        thread::Builder::new()
            .name("console-recognizer".to_string())
            .spawn(move || {
                info!("console recognizer reading stdin");
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if !deliver_line(&reader_active, &reader_tx, line.trim()) {
                        break;
                    }
                }
                info!("console recognizer input closed");
            })
            .map_err(|e| SpeechError::Start(e.to_string()))?;

        info!(language = %recognizer.language, "console recognizer ready");
        Ok(recognizer)
    }

    fn new(language: String, event_tx: mpsc::UnboundedSender<SpeechEvent>) -> Self {
        Self {
            language,
            active: Arc::new(Mutex::new(None)),
            event_tx,
        }
    }

    fn send(&self, event: SpeechEvent) -> Result<(), SpeechError> {
        self.event_tx.send(event).map_err(|_| SpeechError::ChannelSend)
    }

    fn take_active(&self) -> Option<(SessionId, ListenMode)> {
        self.active.lock().ok().and_then(|mut active| active.take())
    }
}

/// Forward one stdin line to the running session; `false` once the channel is closed
fn deliver_line(active: &ActiveSession, tx: &mpsc::UnboundedSender<SpeechEvent>, line: &str) -> bool {
    if line.is_empty() {
        return true;
    }

    let Ok(mut guard) = active.lock() else {
        return false;
    };
    let Some((session, mode)) = *guard else {
        debug!(line, "microphone closed, input dropped");
        return true;
    };

    let mut events = Vec::with_capacity(2);
    if let Some(code) = line.strip_prefix('!') {
        events.push(SpeechEvent::RecognitionError {
            session,
            kind: RecognitionErrorKind::from_code(code),
        });
        events.push(SpeechEvent::RecognitionEnd { session });
        *guard = None;
    } else {
        events.push(SpeechEvent::Result {
            session,
            utterance: Utterance::final_result(line),
        });
        if !mode.is_continuous() {
            events.push(SpeechEvent::RecognitionEnd { session });
            *guard = None;
        }
    }

    events.into_iter().all(|event| tx.send(event).is_ok())
}

impl Recognizer for ConsoleRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&mut self, session: SessionId, mode: ListenMode) -> Result<(), SpeechError> {
        {
            let mut active = self
                .active
                .lock()
                .map_err(|e| SpeechError::Start(e.to_string()))?;
            if active.is_some() {
                return Err(SpeechError::AlreadyRunning);
            }
            *active = Some((session, mode));
        }
        debug!(%session, %mode, language = %self.language, "console microphone open");
        self.send(SpeechEvent::RecognitionStart { session })
    }

    fn stop(&mut self) {
        if let Some((session, _)) = self.take_active() {
            let _ = self.send(SpeechEvent::RecognitionEnd { session });
        }
    }

    fn abort(&mut self) {
        if let Some((session, _)) = self.take_active() {
            let _ = self.send(SpeechEvent::RecognitionError {
                session,
                kind: RecognitionErrorKind::Aborted,
            });
            let _ = self.send(SpeechEvent::RecognitionEnd { session });
        }
    }
}

/// Synthesizer that prints replies and simulates playback time
pub struct ConsoleSynthesizer {
    voice: VoiceSettings,
    event_tx: mpsc::UnboundedSender<SpeechEvent>,
    playing: Option<(UtteranceId, JoinHandle<()>)>,
}

impl ConsoleSynthesizer {
    pub fn new(voice: VoiceSettings, event_tx: mpsc::UnboundedSender<SpeechEvent>) -> Self {
        Self {
            voice,
            event_tx,
            playing: None,
        }
    }

    fn playback_duration(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count().max(1) as f32;
        let rate = if self.voice.rate > 0.0 { self.voice.rate } else { 1.0 };
        WORD_DURATION.mul_f32(words / rate)
    }
}

impl Synthesizer for ConsoleSynthesizer {
    fn speak(&mut self, utterance: UtteranceId, text: &str) -> Result<(), SpeechError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;

        self.cancel();

        println!("Jarvis: {}", text);
        self.event_tx
            .send(SpeechEvent::SpeechStart { utterance })
            .map_err(|_| SpeechError::ChannelSend)?;

        let duration = self.playback_duration(text);
        let tx = self.event_tx.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if tx.send(SpeechEvent::SpeechEnd { utterance }).is_err() {
                warn!(%utterance, "speech end dropped, controller gone");
            }
        });

        self.playing = Some((utterance, handle));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some((utterance, handle)) = self.playing.take() {
            if !handle.is_finished() {
                handle.abort();
                let _ = self.event_tx.send(SpeechEvent::SpeechError {
                    utterance,
                    message: "interrupted".to_string(),
                });
            }
        }
    }
}
