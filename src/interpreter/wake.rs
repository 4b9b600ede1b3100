//! Wake phrase matching

/// Default trigger phrases
pub const DEFAULT_WAKE_WORDS: [&str; 4] = ["hello talha", "hey talha", "hi talha", "talha"];

/// Case-insensitive matcher over a small set of trigger phrases
#[derive(Debug, Clone)]
pub struct WakeWords {
    phrases: Vec<String>,
}

impl WakeWords {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// The first phrase contained in `transcript`, if any
    pub fn detect(&self, transcript: &str) -> Option<&str> {
        let transcript = transcript.to_lowercase();
        self.phrases
            .iter()
            .find(|p| transcript.contains(p.as_str()))
            .map(String::as_str)
    }
}

impl Default for WakeWords {
    fn default() -> Self {
        Self::new(DEFAULT_WAKE_WORDS)
    }
}
