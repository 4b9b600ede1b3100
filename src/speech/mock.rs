//! Recording speech backends for tests
//!
//! Both mocks share one log so overlap between capture and playback can be
//! asserted at the platform boundary.

use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{Recognizer, Synthesizer};
use super::types::{ListenMode, SessionId, SpeechError, UtteranceId};

#[derive(Debug)]
struct Inner {
    supported: bool,
    fail_next_start: bool,
    capturing: Option<SessionId>,
    playing: Option<UtteranceId>,
    starts: Vec<(SessionId, ListenMode)>,
    stops: usize,
    aborts: usize,
    spoken: Vec<String>,
    cancels: usize,
    overlaps: usize,
}

/// Shared view of everything the mocks were asked to do
#[derive(Debug, Clone)]
pub struct MockLog(Arc<Mutex<Inner>>);

impl MockLog {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap()
    }

    pub fn starts(&self) -> usize {
        self.lock().starts.len()
    }

    pub fn last_start_mode(&self) -> Option<ListenMode> {
        self.lock().starts.last().map(|(_, mode)| *mode)
    }

    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    pub fn aborts(&self) -> usize {
        self.lock().aborts
    }

    pub fn cancels(&self) -> usize {
        self.lock().cancels
    }

    pub fn spoken(&self) -> Vec<String> {
        self.lock().spoken.clone()
    }

    /// Times capture and playback were both active
    pub fn overlaps(&self) -> usize {
        self.lock().overlaps
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().capturing.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing.is_some()
    }

    pub fn set_supported(&self, supported: bool) {
        self.lock().supported = supported;
    }

    pub fn fail_next_start(&self) {
        self.lock().fail_next_start = true;
    }

    /// The platform ended capture on its own (result, error or silence)
    pub fn capture_ended(&self) {
        self.lock().capturing = None;
    }

    /// The platform finished playback
    pub fn playback_ended(&self) {
        self.lock().playing = None;
    }
}

pub struct MockRecognizer {
    log: MockLog,
}

pub struct MockSynthesizer {
    log: MockLog,
}

pub fn mock_backends() -> (MockRecognizer, MockSynthesizer, MockLog) {
    let log = MockLog(Arc::new(Mutex::new(Inner {
        supported: true,
        fail_next_start: false,
        capturing: None,
        playing: None,
        starts: Vec::new(),
        stops: 0,
        aborts: 0,
        spoken: Vec::new(),
        cancels: 0,
        overlaps: 0,
    })));
    (
        MockRecognizer { log: log.clone() },
        MockSynthesizer { log: log.clone() },
        log,
    )
}

impl Recognizer for MockRecognizer {
    fn is_supported(&self) -> bool {
        self.log.lock().supported
    }

    fn start(&mut self, session: SessionId, mode: ListenMode) -> Result<(), SpeechError> {
        let mut inner = self.log.lock();
        if inner.fail_next_start {
            inner.fail_next_start = false;
            return Err(SpeechError::Start("mock failure".to_string()));
        }
        if inner.capturing.is_some() {
            return Err(SpeechError::AlreadyRunning);
        }
        if inner.playing.is_some() {
            inner.overlaps += 1;
        }
        inner.capturing = Some(session);
        inner.starts.push((session, mode));
        Ok(())
    }

    fn stop(&mut self) {
        let mut inner = self.log.lock();
        inner.stops += 1;
        inner.capturing = None;
    }

    fn abort(&mut self) {
        let mut inner = self.log.lock();
        inner.aborts += 1;
        inner.capturing = None;
    }
}

impl Synthesizer for MockSynthesizer {
    fn speak(&mut self, utterance: UtteranceId, text: &str) -> Result<(), SpeechError> {
        let mut inner = self.log.lock();
        if inner.capturing.is_some() {
            inner.overlaps += 1;
        }
        inner.playing = Some(utterance);
        inner.spoken.push(text.to_string());
        Ok(())
    }

    fn cancel(&mut self) {
        let mut inner = self.log.lock();
        inner.cancels += 1;
        inner.playing = None;
    }
}
