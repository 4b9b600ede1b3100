//! Speech capability adapter
//!
//! Owns the recognizer and synthesizer handles and enforces the invariants
//! the controller relies on: one running session at a time, no recognition
//! while speaking or inside the post-speech cooldown, and filtering of late
//! events from sessions and utterances that were already retired.

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::backend::{Recognizer, Synthesizer};
use super::types::{
    ListenMode, RecognitionErrorKind, SessionId, SpeechError, SpeechEvent, Utterance, UtteranceId,
};

/// Retired sessions remembered for event filtering
const MAX_RETIRED: usize = 8;

/// One logical start/stop cycle of the recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSession {
    pub id: SessionId,
    pub mode: ListenMode,
    pub started_at: Instant,
    /// Cleared by a graceful stop while the session drains
    pub running: bool,
}

/// Suppression interval anchored at the end of the latest synthesized speech
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindow {
    pub started_at: Instant,
    pub length: Duration,
}

impl CooldownWindow {
    pub fn new(started_at: Instant, length: Duration) -> Self {
        Self { started_at, length }
    }

    pub fn ends_at(&self) -> Instant {
        self.started_at + self.length
    }

    /// Elapsed time is compared against the anchor, not a flag
    pub fn contains(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) < self.length
    }
}

/// Backend events after filtering, as consumed by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechSignal {
    RecognitionStarted(ListenMode),
    Interim(Utterance),
    Final {
        mode: ListenMode,
        utterance: Utterance,
    },
    RecognitionEnded(ListenMode),
    RecognitionFailed {
        mode: ListenMode,
        kind: RecognitionErrorKind,
    },
    SpeechStarted,
    SpeechFinished {
        failed: bool,
    },
}

/// Wraps a recognizer/synthesizer pair behind the controller's contract
pub struct SpeechAdapter<R, S> {
    recognizer: R,
    synthesizer: S,
    session: Option<RecognitionSession>,
    /// Sessions we stopped or that failed, whose end event may still arrive
    retired: Vec<SessionId>,
    next_session: u64,
    next_utterance: u64,
    speaking: Option<UtteranceId>,
    cooldown: Option<CooldownWindow>,
    cooldown_length: Duration,
    last_start: Option<Instant>,
}

impl<R: Recognizer, S: Synthesizer> SpeechAdapter<R, S> {
    pub fn new(recognizer: R, synthesizer: S, cooldown_length: Duration) -> Self {
        Self {
            recognizer,
            synthesizer,
            session: None,
            retired: Vec::new(),
            next_session: 1,
            next_utterance: 1,
            speaking: None,
            cooldown: None,
            cooldown_length,
            last_start: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_supported()
    }

    /// Whether a session is logically running
    pub fn is_listening(&self) -> bool {
        self.session.as_ref().map(|s| s.running).unwrap_or(false)
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.is_some()
    }

    /// Utterance currently playing
    pub fn speaking(&self) -> Option<UtteranceId> {
        self.speaking
    }

    pub fn session(&self) -> Option<&RecognitionSession> {
        self.session.as_ref()
    }

    pub fn last_start(&self) -> Option<Instant> {
        self.last_start
    }

    pub fn cooldown(&self) -> Option<CooldownWindow> {
        self.cooldown
    }

    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown.map(|c| c.contains(now)).unwrap_or(false)
    }

    /// Begin a recognition session
    ///
    /// Returns `false` without touching the recognizer when a session is
    /// already running, speech is playing, or the cooldown window is open.
    pub fn start_listening(&mut self, mode: ListenMode, now: Instant) -> bool {
        if !self.recognizer.is_supported() {
            warn!(%mode, "speech recognition unsupported, not starting");
            return false;
        }
        if let Some(session) = &self.session {
            debug!(current = %session.id, %mode, "recognition already running, start rejected");
            return false;
        }
        if let Some(utterance) = self.speaking {
            debug!(%utterance, %mode, "speaking, start rejected");
            return false;
        }
        if self.in_cooldown(now) {
            debug!(%mode, "inside speech cooldown, start rejected");
            return false;
        }

        let id = SessionId(self.next_session);
        self.next_session += 1;

        match self.recognizer.start(id, mode) {
            Ok(()) => {
                debug!(session = %id, %mode, "recognition session started");
                self.session = Some(RecognitionSession {
                    id,
                    mode,
                    started_at: now,
                    running: true,
                });
                self.last_start = Some(now);
                true
            }
            Err(e) => {
                warn!(?e, session = %id, %mode, "recognizer refused to start");
                false
            }
        }
    }

    /// Graceful stop; no-op when idle or already stopping
    ///
    /// The session stays until its end event arrives so a result already in
    /// flight is still delivered. New starts are rejected until then.
    pub fn stop_listening(&mut self) {
        if let Some(session) = self.session.as_mut().filter(|s| s.running) {
            debug!(session = %session.id, "stopping recognition");
            session.running = false;
            self.recognizer.stop();
        }
    }

    /// Immediate stop; no-op when idle
    pub fn abort_listening(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session = %session.id, "aborting recognition");
            self.recognizer.abort();
            self.retire(session.id);
        }
    }

    /// Speak `text`, aborting recognition and any utterance still playing
    pub fn speak(&mut self, text: &str, now: Instant) -> Result<UtteranceId, SpeechError> {
        self.abort_listening();

        if let Some(previous) = self.speaking.take() {
            debug!(utterance = %previous, "cancelling previous utterance");
            self.synthesizer.cancel();
        }

        let id = UtteranceId(self.next_utterance);
        self.next_utterance += 1;

        match self.synthesizer.speak(id, text) {
            Ok(()) => {
                self.speaking = Some(id);
                Ok(id)
            }
            Err(e) => {
                self.cooldown = Some(CooldownWindow::new(now, self.cooldown_length));
                Err(e)
            }
        }
    }

    /// Cancel playback; the cooldown still starts if something was playing
    pub fn cancel_speech(&mut self, now: Instant) {
        if let Some(utterance) = self.speaking.take() {
            debug!(%utterance, "cancelling speech");
            self.synthesizer.cancel();
            self.cooldown = Some(CooldownWindow::new(now, self.cooldown_length));
        }
    }

    /// Classify a backend event, dropping stale and expected ones
    pub fn observe(&mut self, event: SpeechEvent, now: Instant) -> Option<SpeechSignal> {
        match event {
            SpeechEvent::Result { session, utterance } => {
                let mode = self.delivering_mode(session)?;
                if utterance.is_final {
                    Some(SpeechSignal::Final { mode, utterance })
                } else {
                    Some(SpeechSignal::Interim(utterance))
                }
            }
            SpeechEvent::RecognitionStart { session } => {
                self.current_mode(session).map(SpeechSignal::RecognitionStarted)
            }
            SpeechEvent::RecognitionEnd { session } => {
                if let Some(mode) = self.current_mode(session) {
                    self.session = None;
                    return Some(SpeechSignal::RecognitionEnded(mode));
                }
                if self.is_stopping(session) {
                    self.session = None;
                    debug!(%session, "stopped session drained");
                    return None;
                }
                if let Some(pos) = self.retired.iter().position(|id| *id == session) {
                    self.retired.remove(pos);
                    trace!(%session, "retired session ended");
                }
                None
            }
            SpeechEvent::RecognitionError { session, kind } => {
                if let Some(mode) = self.current_mode(session) {
                    self.session = None;
                    self.retire(session);
                    return Some(SpeechSignal::RecognitionFailed { mode, kind });
                }
                if self.is_stopping(session) {
                    self.session = None;
                    self.retire(session);
                    debug!(%session, %kind, "stopped session failed while draining");
                    return None;
                }
                if kind == RecognitionErrorKind::Aborted {
                    debug!(%session, "expected abort of retired session");
                } else {
                    trace!(%session, %kind, "error from retired session ignored");
                }
                None
            }
            SpeechEvent::SpeechStart { utterance } => {
                if self.speaking == Some(utterance) {
                    Some(SpeechSignal::SpeechStarted)
                } else {
                    None
                }
            }
            SpeechEvent::SpeechEnd { utterance } => self.finish_speech(utterance, false, now),
            SpeechEvent::SpeechError { utterance, message } => {
                if self.speaking == Some(utterance) {
                    warn!(%utterance, %message, "speech synthesis error");
                }
                self.finish_speech(utterance, true, now)
            }
        }
    }

    fn finish_speech(
        &mut self,
        utterance: UtteranceId,
        failed: bool,
        now: Instant,
    ) -> Option<SpeechSignal> {
        if self.speaking != Some(utterance) {
            trace!(%utterance, "completion for stale utterance ignored");
            return None;
        }
        self.speaking = None;
        self.cooldown = Some(CooldownWindow::new(now, self.cooldown_length));
        Some(SpeechSignal::SpeechFinished { failed })
    }

    fn current_mode(&self, session: SessionId) -> Option<ListenMode> {
        match &self.session {
            Some(current) if current.id == session && current.running => Some(current.mode),
            _ => {
                trace!(%session, "event for inactive session ignored");
                None
            }
        }
    }

    /// Mode for results, which a stopped session may still deliver
    fn delivering_mode(&self, session: SessionId) -> Option<ListenMode> {
        match &self.session {
            Some(current) if current.id == session => Some(current.mode),
            _ => {
                trace!(%session, "result for inactive session ignored");
                None
            }
        }
    }

    fn is_stopping(&self, session: SessionId) -> bool {
        matches!(&self.session, Some(current) if current.id == session && !current.running)
    }

    fn retire(&mut self, session: SessionId) {
        if self.retired.len() >= MAX_RETIRED {
            self.retired.remove(0);
        }
        self.retired.push(session);
    }
}
