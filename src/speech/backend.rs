//! Platform seams for speech recognition and synthesis
//!
//! Backends report progress asynchronously as [`SpeechEvent`]s on the channel
//! they were constructed with; these calls only request work.
//!
//! [`SpeechEvent`]: super::SpeechEvent

use super::types::{ListenMode, SessionId, SpeechError, UtteranceId};

/// Speech-to-text capability
pub trait Recognizer: Send {
    /// Whether the platform can recognize speech at all
    fn is_supported(&self) -> bool;

    /// Begin capturing audio for `session`
    fn start(&mut self, session: SessionId, mode: ListenMode) -> Result<(), SpeechError>;

    /// Stop capturing; results already in flight may still be delivered
    fn stop(&mut self);

    /// Stop capturing immediately and discard pending results
    fn abort(&mut self);
}

/// Text-to-speech capability
pub trait Synthesizer: Send {
    /// Queue `text` for playback as `utterance`
    fn speak(&mut self, utterance: UtteranceId, text: &str) -> Result<(), SpeechError>;

    /// Cancel anything currently playing
    fn cancel(&mut self);
}
