//! Core assistant controller
//!
//! Drives the Idle, WaitingForWakeWord and Awake modes from user toggles,
//! filtered speech signals and timer expiries. Every handler takes the
//! current instant so the whole machine can be driven deterministically.

use std::time::Instant;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{AssistantConfig, Timings};
use crate::events::AssistantEvent;
use crate::host::{HostBindings, Theme};
use crate::interpreter::{replies, DeactivateScope, Intent, Interpreter, ThemeTarget, WakeWords};
use crate::speech::{
    ListenMode, RecognitionErrorKind, Recognizer, SpeechAdapter, SpeechEvent, SpeechSignal,
    Synthesizer, Utterance,
};

use super::retry::{AbortVerdict, RetryBudget};
use super::timers::{TimerKind, Timers};

/// Upper bound on timers handled in one wakeup
const MAX_TIMERS_PER_TICK: usize = 16;

const STATUS_WAKE_LISTENING: &str = "Listening for 'Hello Talha'...";
const STATUS_COMMAND_LISTENING: &str = "Listening...";
const STATUS_AWAKE: &str = "Ready for command";
const STATUS_PROCESSING: &str = "Processing...";
const STATUS_READY: &str = "Ready for next command";
const STATUS_SLEEPING: &str = "Going to sleep...";
const STATUS_PERMISSION: &str = "Microphone access denied";
const STATUS_UNSUPPORTED: &str = "Speech recognition not supported";

/// Underlying activation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Switched off
    #[default]
    Idle,
    /// Listening continuously for a wake phrase
    WaitingForWakeWord,
    /// Listening for one command at a time
    Awake,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::WaitingForWakeWord => write!(f, "WaitingForWakeWord"),
            Mode::Awake => write!(f, "Awake"),
        }
    }
}

/// State reported to observers
///
/// `Speaking` overlays the mode while synthesis is playing, and
/// `CoolingDown` while an active assistant waits out the post-speech
/// window or an abort back-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantState {
    #[default]
    Idle,
    WaitingForWakeWord,
    Awake,
    Speaking,
    CoolingDown,
}

impl From<Mode> for AssistantState {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Idle => AssistantState::Idle,
            Mode::WaitingForWakeWord => AssistantState::WaitingForWakeWord,
            Mode::Awake => AssistantState::Awake,
        }
    }
}

impl std::fmt::Display for AssistantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantState::Idle => write!(f, "Idle"),
            AssistantState::WaitingForWakeWord => write!(f, "WaitingForWakeWord"),
            AssistantState::Awake => write!(f, "Awake"),
            AssistantState::Speaking => write!(f, "Speaking"),
            AssistantState::CoolingDown => write!(f, "CoolingDown"),
        }
    }
}

/// User-facing activation commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Toggle,
    Activate,
    Deactivate,
}

/// A control command with an optional reply carrying the resulting
/// activation flag
#[derive(Debug)]
pub struct ControlRequest {
    pub command: ControlCommand,
    pub reply: Option<oneshot::Sender<bool>>,
}

impl ControlRequest {
    pub fn new(command: ControlCommand) -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                command,
                reply: Some(tx),
            },
            rx,
        )
    }
}

/// Status line and live transcript shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSurface {
    pub status_message: String,
    pub recognized_text: String,
}

/// What happens once the current utterance finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum AfterSpeech {
    /// Listen again in the current mode after the cooldown
    #[default]
    Resume,
    /// Drop back to wake-word listening
    Standby,
    /// Switch off
    Deactivate,
}

/// The controller that owns speech, host and timers
pub struct Controller<R, S, H> {
    mode: Mode,
    /// Time when the current non-Idle mode was entered
    mode_entered_at: Option<Instant>,
    reported: AssistantState,
    adapter: SpeechAdapter<R, S>,
    host: H,
    interpreter: Interpreter,
    wake_words: WakeWords,
    timings: Timings,
    retry: RetryBudget,
    timers: Timers,
    after_speech: AfterSpeech,
    status: StatusSurface,
    event_tx: broadcast::Sender<AssistantEvent>,
}

impl<R: Recognizer, S: Synthesizer, H: HostBindings> Controller<R, S, H> {
    pub fn new(
        adapter: SpeechAdapter<R, S>,
        host: H,
        interpreter: Interpreter,
        config: &AssistantConfig,
        event_tx: broadcast::Sender<AssistantEvent>,
    ) -> Self {
        let timings = config.timings.clone();
        Self {
            mode: Mode::Idle,
            mode_entered_at: None,
            reported: AssistantState::Idle,
            adapter,
            host,
            interpreter,
            wake_words: WakeWords::new(&config.wake_words),
            retry: RetryBudget::new(
                timings.max_abort_retries,
                timings.abort_window(),
                timings.abort_cooldown(),
            ),
            timings,
            timers: Timers::default(),
            after_speech: AfterSpeech::Resume,
            status: StatusSurface::default(),
            event_tx,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode != Mode::Idle
    }

    /// Reported state at `now`
    pub fn state(&self, now: Instant) -> AssistantState {
        if self.adapter.is_speaking() {
            AssistantState::Speaking
        } else if self.is_active() && (self.adapter.in_cooldown(now) || self.retry.in_backoff(now))
        {
            AssistantState::CoolingDown
        } else {
            self.mode.into()
        }
    }

    pub fn status(&self) -> &StatusSurface {
        &self.status
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn adapter(&self) -> &SpeechAdapter<R, S> {
        &self.adapter
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Queue the introduction after the configured delay
    pub fn schedule_greeting(&mut self, now: Instant) {
        debug!(delay_ms = self.timings.greeting_delay_ms, "greeting scheduled");
        self.timers
            .schedule(TimerKind::Greeting, now + self.timings.greeting_delay());
    }

    /// Run the controller until an input channel closes
    pub async fn run(
        &mut self,
        mut control_rx: mpsc::Receiver<ControlRequest>,
        mut speech_rx: mpsc::UnboundedReceiver<SpeechEvent>,
    ) {
        info!("controller started in Idle state");

        loop {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                request = control_rx.recv() => {
                    let Some(request) = request else { break };
                    self.handle_control(request.command, Instant::now());
                    if let Some(reply) = request.reply {
                        let _ = reply.send(self.is_active());
                    }
                }
                event = speech_rx.recv() => {
                    let Some(event) = event else { break };
                    self.handle_speech_event(event, Instant::now());
                }
                _ = sleep_until(deadline) => {
                    self.fire_due_timers(Instant::now());
                }
            }
        }

        self.deactivate(Instant::now());
        info!("controller stopped");
    }

    /// Apply a user activation command
    pub fn handle_control(&mut self, command: ControlCommand, now: Instant) {
        debug!(?command, mode = %self.mode, "control command");
        match command {
            ControlCommand::Toggle if self.is_active() => self.deactivate(now),
            ControlCommand::Toggle | ControlCommand::Activate => self.activate(now),
            ControlCommand::Deactivate => self.deactivate(now),
        }
        self.publish_state(now);
    }

    /// Apply a raw backend event
    pub fn handle_speech_event(&mut self, event: SpeechEvent, now: Instant) {
        if let Some(signal) = self.adapter.observe(event, now) {
            self.handle_signal(signal, now);
        }
        self.publish_state(now);
    }

    /// Run every timer due at `now`
    pub fn fire_due_timers(&mut self, now: Instant) {
        for _ in 0..MAX_TIMERS_PER_TICK {
            let Some(kind) = self.timers.take_due(now) else {
                break;
            };
            self.handle_timer(kind, now);
        }
        self.publish_state(now);
    }

    fn activate(&mut self, now: Instant) {
        if self.is_active() {
            debug!(mode = %self.mode, "already active");
            return;
        }

        if !self.adapter.is_supported() {
            warn!("speech recognition is not supported on this platform");
            self.set_status(STATUS_UNSUPPORTED);
            self.emit(AssistantEvent::Unsupported);
            self.say(replies::UNSUPPORTED, AfterSpeech::Resume, now);
            return;
        }

        self.retry.reset();
        self.enter_mode(Mode::WaitingForWakeWord, now);
        self.begin_listening(now);
    }

    /// Switch off; safe to call in any mode
    ///
    /// A pending startup greeting survives; it is not tied to activation.
    fn deactivate(&mut self, now: Instant) {
        self.timers.cancel_all_except(TimerKind::Greeting);
        self.adapter.abort_listening();
        self.adapter.cancel_speech(now);
        self.after_speech = AfterSpeech::Resume;
        self.retry.reset();
        self.enter_mode(Mode::Idle, now);
        if self.status != StatusSurface::default() {
            self.status = StatusSurface::default();
            self.emit_status();
        }
    }

    fn enter_mode(&mut self, new_mode: Mode, now: Instant) {
        let old_mode = self.mode;
        if new_mode == old_mode {
            return;
        }

        let duration_ms = self
            .mode_entered_at
            .map(|t| now.saturating_duration_since(t).as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_mode,
            to = %new_mode,
            duration_ms = duration_ms,
            "mode transition"
        );

        self.mode = new_mode;
        self.mode_entered_at = if new_mode != Mode::Idle {
            Some(now)
        } else {
            None
        };

        if (old_mode == Mode::Idle) != (new_mode == Mode::Idle) {
            self.emit(AssistantEvent::ActiveChanged {
                active: new_mode != Mode::Idle,
            });
        }
    }

    fn listen_mode(&self) -> Option<ListenMode> {
        match self.mode {
            Mode::Idle => None,
            Mode::WaitingForWakeWord => Some(ListenMode::WakeWord),
            Mode::Awake => Some(ListenMode::Command),
        }
    }

    /// Start a session for the current mode now, or schedule the earliest
    /// allowed restart
    fn begin_listening(&mut self, now: Instant) {
        let Some(listen) = self.listen_mode() else {
            return;
        };
        if self.adapter.is_listening() || self.adapter.is_speaking() {
            return;
        }
        if self.retry.in_backoff(now) {
            debug!("abort back-off in effect, restart deferred");
            return;
        }
        if let Some(cooldown) = self.adapter.cooldown().filter(|c| c.contains(now)) {
            self.timers.schedule(TimerKind::Restart, cooldown.ends_at());
            return;
        }
        if let Some(last) = self.adapter.last_start() {
            let earliest = last + self.timings.min_restart_delay();
            if now < earliest {
                self.timers.schedule(TimerKind::Restart, earliest);
                return;
            }
        }

        self.timers.cancel(TimerKind::Restart);
        if self.mode == Mode::Awake && !self.timers.is_pending(TimerKind::Inactivity) {
            self.timers
                .schedule(TimerKind::Inactivity, now + self.timings.command_timeout());
        }

        if self.adapter.start_listening(listen, now) {
            info!(mode = %listen, "listening");
            let message = match listen {
                ListenMode::WakeWord => STATUS_WAKE_LISTENING,
                ListenMode::Command => STATUS_COMMAND_LISTENING,
            };
            self.status.recognized_text.clear();
            self.set_status(message);
            self.emit(AssistantEvent::ListeningStarted { mode: listen });
        } else {
            self.schedule_restart(self.timings.min_restart_delay(), now);
        }
    }

    fn schedule_restart(&mut self, delay: std::time::Duration, now: Instant) {
        if !self.is_active() || self.retry.in_backoff(now) {
            return;
        }
        self.timers.schedule(TimerKind::Restart, now + delay);
    }

    fn handle_timer(&mut self, kind: TimerKind, now: Instant) {
        debug!(?kind, "timer fired");
        match kind {
            TimerKind::Restart => self.begin_listening(now),
            TimerKind::Cooldown => {
                info!("abort back-off elapsed, restarting recognition");
                self.retry.reset();
                self.begin_listening(now);
            }
            TimerKind::Inactivity => {
                if self.mode == Mode::Awake && !self.adapter.is_speaking() {
                    info!(
                        timeout_ms = self.timings.command_timeout_ms,
                        "no command received, going to sleep"
                    );
                    self.set_status(STATUS_SLEEPING);
                    self.say(replies::SLEEP_NOTICE, AfterSpeech::Deactivate, now);
                }
            }
            TimerKind::Status => {
                if self.is_active() {
                    self.status.recognized_text.clear();
                    self.set_status(STATUS_READY);
                }
            }
            TimerKind::Greeting => {
                info!("greeting");
                self.say(replies::GREETING, AfterSpeech::Resume, now);
            }
        }
    }

    fn handle_signal(&mut self, signal: SpeechSignal, now: Instant) {
        match signal {
            SpeechSignal::RecognitionStarted(mode) => {
                debug!(%mode, "recognizer confirmed start");
            }
            SpeechSignal::Interim(utterance) => {
                self.status.recognized_text = utterance.text;
                self.emit_status();
            }
            SpeechSignal::Final { mode, utterance } => {
                debug!(%mode, text = %utterance.text, "final result");
                self.retry.reset();
                self.handle_final(utterance, now);
            }
            SpeechSignal::RecognitionEnded(mode) => {
                debug!(%mode, "recognition ended");
                self.retry.reset();
                self.schedule_restart(self.timings.min_restart_delay(), now);
            }
            SpeechSignal::RecognitionFailed { mode, kind } => {
                self.handle_recognition_error(mode, kind, now);
            }
            SpeechSignal::SpeechStarted => {
                debug!("speech playback started");
            }
            SpeechSignal::SpeechFinished { failed } => {
                if failed {
                    warn!("speech ended with an error");
                }
                self.finish_speaking(now);
            }
        }
    }

    fn handle_final(&mut self, utterance: Utterance, now: Instant) {
        let text = utterance.normalized();
        if text.is_empty() {
            return;
        }
        if self.adapter.is_speaking() || self.adapter.in_cooldown(now) {
            debug!(%text, "utterance during speech or cooldown ignored");
            return;
        }

        match self.mode {
            Mode::Idle => {}
            Mode::WaitingForWakeWord => self.handle_wake_candidate(&text, now),
            Mode::Awake => self.handle_command(utterance.text.trim(), now),
        }
    }

    fn handle_wake_candidate(&mut self, text: &str, now: Instant) {
        let Some(phrase) = self.wake_words.detect(text).map(str::to_string) else {
            debug!(%text, "no wake phrase, re-arming");
            self.adapter.stop_listening();
            self.schedule_restart(self.timings.min_restart_delay(), now);
            return;
        };

        info!(%phrase, "wake word detected");
        self.emit(AssistantEvent::WakeWordDetected { phrase });
        self.enter_mode(Mode::Awake, now);
        self.status.recognized_text.clear();
        self.set_status(STATUS_AWAKE);

        let acknowledgement = replies::ACKNOWLEDGEMENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(replies::ACKNOWLEDGEMENTS[0]);
        self.say(acknowledgement, AfterSpeech::Resume, now);
    }

    fn handle_command(&mut self, text: &str, now: Instant) {
        self.timers.cancel(TimerKind::Inactivity);
        self.status.recognized_text = text.to_string();
        self.set_status(STATUS_PROCESSING);

        let intent = self.interpreter.interpret(text);
        info!(%text, %intent, "command recognized");
        self.emit(AssistantEvent::CommandRecognized {
            text: text.to_string(),
            intent: intent.to_string(),
        });

        self.execute(intent, now);
    }

    fn execute(&mut self, intent: Intent, now: Instant) {
        match intent {
            Intent::Navigate(section) => match self.host.navigate_to_section(section) {
                Ok(()) => {
                    self.emit(AssistantEvent::Navigated { section });
                    self.respond(replies::navigation_confirmation(section), now);
                }
                Err(e) => {
                    warn!(%e, %section, "navigation failed");
                    self.respond(&replies::navigation_failure(section), now);
                }
            },
            Intent::ToggleTheme(target) => {
                let current = self.host.current_theme();
                let wanted = match target {
                    ThemeTarget::Dark => Some(Theme::Dark),
                    ThemeTarget::Light => Some(Theme::Light),
                    ThemeTarget::Toggle => None,
                };
                match wanted {
                    Some(theme) if theme == current => {
                        self.respond(&replies::theme_unchanged(theme), now);
                    }
                    Some(_) => {
                        let theme = self.host.toggle_theme();
                        self.emit(AssistantEvent::ThemeChanged { theme });
                        self.respond(&replies::theme_switched(theme), now);
                    }
                    None => {
                        let theme = self.host.toggle_theme();
                        self.emit(AssistantEvent::ThemeChanged { theme });
                        self.respond(&replies::theme_toggled(theme), now);
                    }
                }
            }
            Intent::Deactivate(DeactivateScope::Shutdown) => {
                self.set_status(STATUS_SLEEPING);
                self.say(replies::GOODBYE, AfterSpeech::Deactivate, now);
            }
            Intent::Deactivate(DeactivateScope::Standby) => {
                self.say(replies::STANDBY, AfterSpeech::Standby, now);
            }
            Intent::Inform(topic) => {
                let answer = self.interpreter.answer(&topic);
                self.respond(&answer, now);
            }
            Intent::Unknown => self.respond(replies::fallback(), now),
        }
    }

    /// Speak a command reply and reset the status line afterwards
    fn respond(&mut self, text: &str, now: Instant) {
        self.say(text, AfterSpeech::Resume, now);
        self.timers
            .schedule(TimerKind::Status, now + self.timings.status_reset());
    }

    fn handle_recognition_error(
        &mut self,
        mode: ListenMode,
        kind: RecognitionErrorKind,
        now: Instant,
    ) {
        match kind {
            RecognitionErrorKind::PermissionDenied => {
                warn!(%mode, "microphone permission denied");
                self.emit(AssistantEvent::PermissionDenied);
                self.deactivate(now);
                self.set_status(STATUS_PERMISSION);
                self.say(replies::PERMISSION_DENIED, AfterSpeech::Resume, now);
            }
            RecognitionErrorKind::NoSpeech => {
                debug!(%mode, "no speech detected, restarting");
                let delay = if self.mode == Mode::Awake {
                    self.timings.no_speech_restart_delay()
                } else {
                    self.timings.min_restart_delay()
                };
                self.schedule_restart(delay, now);
            }
            RecognitionErrorKind::Aborted => match self.retry.record_abort(now) {
                AbortVerdict::Retry => {
                    self.schedule_restart(self.timings.min_restart_delay(), now);
                }
                AbortVerdict::BackOff { until } => {
                    let cooldown_ms = self.retry.cooldown().as_millis() as u64;
                    warn!(
                        aborts = self.retry.count(),
                        cooldown_ms,
                        "too many aborts, backing off"
                    );
                    self.emit(AssistantEvent::RetryBackoff {
                        aborts: self.retry.count(),
                        cooldown_ms,
                    });
                    self.timers.cancel(TimerKind::Restart);
                    self.timers.schedule(TimerKind::Cooldown, until);
                }
            },
            RecognitionErrorKind::Other(code) => {
                warn!(%mode, %code, "recognition error");
                self.retry.reset();
                self.schedule_restart(self.timings.min_restart_delay(), now);
            }
        }
    }

    /// Speak, suspending recognition and the inactivity timer until done
    fn say(&mut self, text: &str, after: AfterSpeech, now: Instant) {
        self.timers.cancel(TimerKind::Restart);
        self.timers.cancel(TimerKind::Inactivity);
        self.after_speech = after;

        match self.adapter.speak(text, now) {
            Ok(utterance) => {
                debug!(%utterance, %text, "speaking");
                self.emit(AssistantEvent::Spoke {
                    text: text.to_string(),
                });
            }
            Err(e) => {
                warn!(?e, "speech synthesis failed");
                self.finish_speaking(now);
            }
        }
    }

    fn finish_speaking(&mut self, now: Instant) {
        match std::mem::take(&mut self.after_speech) {
            AfterSpeech::Deactivate => self.deactivate(now),
            AfterSpeech::Standby => {
                self.timers.cancel(TimerKind::Inactivity);
                self.enter_mode(Mode::WaitingForWakeWord, now);
                self.schedule_restart(self.timings.post_speech_restart(), now);
            }
            AfterSpeech::Resume => {
                self.schedule_restart(self.timings.post_speech_restart(), now);
            }
        }
    }

    fn set_status(&mut self, message: &str) {
        self.status.status_message = message.to_string();
        self.emit_status();
    }

    fn emit_status(&self) {
        self.emit(AssistantEvent::StatusChanged {
            status_message: self.status.status_message.clone(),
            recognized_text: self.status.recognized_text.clone(),
        });
    }

    /// Broadcast the reported state if it changed
    fn publish_state(&mut self, now: Instant) {
        let state = self.state(now);
        if state == self.reported {
            return;
        }
        let from = self.reported;
        self.reported = state;
        info!(from = %from, to = %state, "state transition");
        self.emit(AssistantEvent::StateChanged { from, to: state });
    }

    fn emit(&self, event: AssistantEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::host::{ConsoleHost, SectionId};
    use crate::speech::mock::{mock_backends, MockLog, MockRecognizer, MockSynthesizer};

    type TestController = Controller<MockRecognizer, MockSynthesizer, ConsoleHost>;

    fn create_controller_with(
        host: ConsoleHost,
    ) -> (TestController, MockLog, broadcast::Receiver<AssistantEvent>) {
        let config = AssistantConfig::default();
        let (recognizer, synthesizer, log) = mock_backends();
        let adapter =
            SpeechAdapter::new(recognizer, synthesizer, config.timings.speech_cooldown());
        let (tx, rx) = broadcast::channel(256);
        let controller = Controller::new(adapter, host, Interpreter::default(), &config, tx);
        (controller, log, rx)
    }

    fn create_controller() -> (TestController, MockLog, broadcast::Receiver<AssistantEvent>) {
        create_controller_with(ConsoleHost::new(Theme::Dark))
    }

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    fn hear(controller: &mut TestController, text: &str, now: Instant) {
        let session = controller.adapter().session().map(|s| s.id).unwrap();
        controller.handle_speech_event(
            SpeechEvent::Result {
                session,
                utterance: Utterance::final_result(text),
            },
            now,
        );
    }

    fn finish_speech(controller: &mut TestController, log: &MockLog, now: Instant) {
        let utterance = controller.adapter().speaking().unwrap();
        log.playback_ended();
        controller.handle_speech_event(SpeechEvent::SpeechEnd { utterance }, now);
    }

    fn fail_session(
        controller: &mut TestController,
        log: &MockLog,
        kind: RecognitionErrorKind,
        now: Instant,
    ) {
        let session = controller.adapter().session().map(|s| s.id).unwrap();
        log.capture_ended();
        controller.handle_speech_event(SpeechEvent::RecognitionError { session, kind }, now);
    }

    fn assert_exclusive(controller: &TestController, log: &MockLog) {
        assert!(!(controller.adapter().is_listening() && controller.adapter().is_speaking()));
        assert_eq!(log.overlaps(), 0);
    }

    /// Activate and wake up, finishing the acknowledgement and resuming
    /// command listening. Returns the instant listening resumed.
    fn wake(controller: &mut TestController, log: &MockLog, t0: Instant) -> Instant {
        controller.handle_control(ControlCommand::Toggle, t0);
        hear(controller, "hello talha", at(t0, 1000));
        finish_speech(controller, log, at(t0, 2000));
        let resumed = at(t0, 3700);
        controller.fire_due_timers(resumed);
        assert!(controller.adapter().is_listening());
        resumed
    }

    #[test]
    fn test_initial_state() {
        let (controller, log, _) = create_controller();
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(controller.state(Instant::now()), AssistantState::Idle);
        assert_eq!(log.starts(), 0);
    }

    #[test]
    fn test_toggle_starts_wake_word_listening() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);

        assert_eq!(controller.mode(), Mode::WaitingForWakeWord);
        assert_eq!(log.starts(), 1);
        assert_eq!(log.last_start_mode(), Some(ListenMode::WakeWord));
        assert_eq!(controller.status().status_message, STATUS_WAKE_LISTENING);
    }

    #[test]
    fn test_toggle_off_is_idempotent() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        controller.handle_control(ControlCommand::Toggle, at(t0, 100));
        controller.handle_control(ControlCommand::Deactivate, at(t0, 200));

        assert_eq!(controller.mode(), Mode::Idle);
        assert!(!controller.adapter().is_listening());
        assert_eq!(controller.next_deadline(), None);
        assert_eq!(log.aborts(), 1);
    }

    #[test]
    fn test_wake_word_case_insensitive() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        hear(&mut controller, "Hello Talha", at(t0, 500));

        assert_eq!(controller.mode(), Mode::Awake);
        let spoken = log.spoken();
        assert_eq!(spoken.len(), 1);
        assert!(replies::ACKNOWLEDGEMENTS.contains(&spoken[0].as_str()));
        assert!(!log.is_capturing());
        assert_exclusive(&controller, &log);
    }

    #[test]
    fn test_non_matching_phrase_re_arms() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        let session = controller.adapter().session().map(|s| s.id).unwrap();
        hear(&mut controller, "hello world", at(t0, 1000));

        assert_eq!(controller.mode(), Mode::WaitingForWakeWord);
        assert!(log.spoken().is_empty());
        assert_eq!(log.stops(), 1);

        controller.fire_due_timers(at(t0, 1100));
        assert_eq!(log.starts(), 1);

        // the stopped session has not ended yet
        controller.fire_due_timers(at(t0, 1300));
        assert_eq!(log.starts(), 1);

        controller.handle_speech_event(SpeechEvent::RecognitionEnd { session }, at(t0, 1350));
        assert!(controller.adapter().session().is_none());
        controller.fire_due_timers(at(t0, 1600));
        assert_eq!(log.starts(), 2);
        assert_eq!(log.last_start_mode(), Some(ListenMode::WakeWord));
    }

    #[test]
    fn test_late_wake_phrase_after_re_arm_still_wakes() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        hear(&mut controller, "hello world", at(t0, 1000));
        hear(&mut controller, "hello talha", at(t0, 1050));

        assert_eq!(controller.mode(), Mode::Awake);
        assert_eq!(log.spoken().len(), 1);
        assert!(controller.adapter().session().is_none());
        assert_exclusive(&controller, &log);
    }

    #[test]
    fn test_refused_start_retried_after_min_delay() {
        let (mut controller, log, _) = create_controller();
        log.fail_next_start();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        assert_eq!(controller.mode(), Mode::WaitingForWakeWord);
        assert!(!controller.adapter().is_listening());
        assert!(controller.adapter().session().is_none());
        assert_eq!(log.starts(), 0);

        controller.fire_due_timers(at(t0, 200));
        assert_eq!(log.starts(), 0);

        controller.fire_due_timers(at(t0, 300));
        assert_eq!(log.starts(), 1);
        assert!(controller.adapter().is_listening());
        assert_eq!(controller.status().status_message, STATUS_WAKE_LISTENING);
    }

    #[test]
    fn test_full_cycle() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        let resumed = wake(&mut controller, &log, t0);
        assert_eq!(log.last_start_mode(), Some(ListenMode::Command));
        assert_eq!(controller.state(resumed), AssistantState::Awake);

        hear(&mut controller, "go to contact", at(t0, 4000));
        assert_eq!(controller.host().visited(), &[SectionId::Contact]);
        assert_eq!(
            log.spoken().last().map(String::as_str),
            Some(replies::navigation_confirmation(SectionId::Contact))
        );
        assert_eq!(controller.state(at(t0, 4000)), AssistantState::Speaking);
        assert_exclusive(&controller, &log);

        finish_speech(&mut controller, &log, at(t0, 5000));
        controller.fire_due_timers(at(t0, 6700));
        assert!(controller.adapter().is_listening());
        assert_eq!(controller.status().status_message, STATUS_COMMAND_LISTENING);

        controller.fire_due_timers(at(t0, 6700 + 15_000));
        assert_eq!(
            log.spoken().last().map(String::as_str),
            Some(replies::SLEEP_NOTICE)
        );
        assert_eq!(controller.mode(), Mode::Awake);

        finish_speech(&mut controller, &log, at(t0, 23_000));
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(
            log.spoken()
                .iter()
                .filter(|s| s.as_str() == replies::SLEEP_NOTICE)
                .count(),
            1
        );
        assert_exclusive(&controller, &log);
    }

    #[test]
    fn test_cooldown_blocks_restart() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        hear(&mut controller, "hey talha", at(t0, 1000));
        finish_speech(&mut controller, &log, at(t0, 2000));

        assert_eq!(controller.state(at(t0, 2100)), AssistantState::CoolingDown);
        controller.fire_due_timers(at(t0, 3400));
        assert!(!controller.adapter().is_listening());
        assert_eq!(log.starts(), 1);

        controller.fire_due_timers(at(t0, 3700));
        assert!(controller.adapter().is_listening());
        assert_eq!(log.starts(), 2);
    }

    #[test]
    fn test_utterance_during_speech_ignored() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        hear(&mut controller, "go to work", at(t0, 4000));
        let spoken = log.spoken().len();

        // late result from the aborted session
        let stale = crate::speech::SessionId(2);
        controller.handle_speech_event(
            SpeechEvent::Result {
                session: stale,
                utterance: Utterance::final_result("go to contact"),
            },
            at(t0, 4100),
        );

        assert_eq!(log.spoken().len(), spoken);
        assert_eq!(controller.host().visited(), &[SectionId::Work]);
    }

    #[test]
    fn test_goodbye_deactivates_after_speech() {
        let (mut controller, log, mut rx) = create_controller();
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        let starts = log.starts();
        hear(&mut controller, "goodbye", at(t0, 4000));

        assert_eq!(log.spoken().last().map(String::as_str), Some(replies::GOODBYE));
        assert_eq!(controller.mode(), Mode::Awake);

        finish_speech(&mut controller, &log, at(t0, 5000));
        assert_eq!(controller.mode(), Mode::Idle);

        controller.fire_due_timers(at(t0, 60_000));
        assert_eq!(log.starts(), starts);

        let mut deactivated = false;
        while let Ok(event) = rx.try_recv() {
            if event == (AssistantEvent::ActiveChanged { active: false }) {
                deactivated = true;
            }
        }
        assert!(deactivated);
    }

    #[test]
    fn test_return_to_sleep_goes_to_standby() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        hear(&mut controller, "go to sleep", at(t0, 4000));
        assert_eq!(log.spoken().last().map(String::as_str), Some(replies::STANDBY));

        finish_speech(&mut controller, &log, at(t0, 5000));
        assert_eq!(controller.mode(), Mode::WaitingForWakeWord);

        controller.fire_due_timers(at(t0, 6700));
        assert_eq!(log.last_start_mode(), Some(ListenMode::WakeWord));
    }

    #[test]
    fn test_unknown_project_uses_default_description() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        hear(&mut controller, "tell me about projectX", at(t0, 4000));

        let reply = log.spoken().last().cloned().unwrap();
        assert!(reply.contains(crate::interpreter::DEFAULT_PROJECT_DESCRIPTION));
    }

    #[test]
    fn test_theme_already_set() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        hear(&mut controller, "switch to dark mode", at(t0, 4000));

        assert_eq!(controller.host().current_theme(), Theme::Dark);
        assert_eq!(
            log.spoken().last().cloned(),
            Some(replies::theme_unchanged(Theme::Dark))
        );
    }

    #[test]
    fn test_theme_switch() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        hear(&mut controller, "switch to light mode", at(t0, 4000));

        assert_eq!(controller.host().current_theme(), Theme::Light);
        assert_eq!(
            log.spoken().last().cloned(),
            Some(replies::theme_switched(Theme::Light))
        );
    }

    #[test]
    fn test_navigation_failure_reply() {
        let host = ConsoleHost::with_sections(Theme::Dark, [SectionId::Home]);
        let (mut controller, log, _) = create_controller_with(host);
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        hear(&mut controller, "go to contact", at(t0, 4000));

        assert!(controller.host().visited().is_empty());
        assert_eq!(
            log.spoken().last().cloned(),
            Some(replies::navigation_failure(SectionId::Contact))
        );
    }

    #[test]
    fn test_abort_storm_backs_off() {
        let (mut controller, log, mut rx) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        fail_session(&mut controller, &log, RecognitionErrorKind::Aborted, at(t0, 100));
        controller.fire_due_timers(at(t0, 400));
        assert_eq!(log.starts(), 2);

        fail_session(&mut controller, &log, RecognitionErrorKind::Aborted, at(t0, 500));
        controller.fire_due_timers(at(t0, 800));
        assert_eq!(log.starts(), 3);

        fail_session(&mut controller, &log, RecognitionErrorKind::Aborted, at(t0, 900));
        assert_eq!(controller.state(at(t0, 1000)), AssistantState::CoolingDown);
        let backoff = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|event| matches!(event, AssistantEvent::RetryBackoff { .. }));
        assert_eq!(
            backoff,
            Some(AssistantEvent::RetryBackoff {
                aborts: 3,
                cooldown_ms: 2_000
            })
        );

        controller.fire_due_timers(at(t0, 2000));
        assert_eq!(log.starts(), 3);

        controller.fire_due_timers(at(t0, 2900));
        assert_eq!(log.starts(), 4);
        assert!(controller.adapter().is_listening());

        controller.fire_due_timers(at(t0, 10_000));
        assert_eq!(log.starts(), 4);
    }

    #[test]
    fn test_no_speech_restart_delay_in_command_mode() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        let resumed = wake(&mut controller, &log, t0);
        let starts = log.starts();
        let failed_at = resumed + Duration::from_millis(5000);
        fail_session(&mut controller, &log, RecognitionErrorKind::NoSpeech, failed_at);

        controller.fire_due_timers(failed_at + Duration::from_millis(400));
        assert_eq!(log.starts(), starts);
        controller.fire_due_timers(failed_at + Duration::from_millis(500));
        assert_eq!(log.starts(), starts + 1);
        assert_eq!(controller.mode(), Mode::Awake);
    }

    #[test]
    fn test_permission_denied_goes_idle() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        fail_session(
            &mut controller,
            &log,
            RecognitionErrorKind::PermissionDenied,
            at(t0, 100),
        );

        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(log.spoken(), vec![replies::PERMISSION_DENIED.to_string()]);

        finish_speech(&mut controller, &log, at(t0, 1000));
        controller.fire_due_timers(at(t0, 10_000));
        assert_eq!(log.starts(), 1);
    }

    #[test]
    fn test_unsupported_platform_stays_idle() {
        let (mut controller, log, mut rx) = create_controller();
        log.set_supported(false);
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);

        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(log.starts(), 0);
        assert_eq!(log.spoken(), vec![replies::UNSUPPORTED.to_string()]);

        let mut unsupported = false;
        while let Ok(event) = rx.try_recv() {
            if event == AssistantEvent::Unsupported {
                unsupported = true;
            }
        }
        assert!(unsupported);
    }

    #[test]
    fn test_greeting_then_listening_resumes() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.schedule_greeting(t0);
        controller.handle_control(ControlCommand::Toggle, at(t0, 500));
        assert!(controller.adapter().is_listening());

        controller.fire_due_timers(at(t0, 2000));
        assert_eq!(log.spoken(), vec![replies::GREETING.to_string()]);
        assert!(!controller.adapter().is_listening());
        assert_exclusive(&controller, &log);

        finish_speech(&mut controller, &log, at(t0, 6000));
        controller.fire_due_timers(at(t0, 7700));
        assert_eq!(log.starts(), 2);
        assert_eq!(log.last_start_mode(), Some(ListenMode::WakeWord));
    }

    #[test]
    fn test_greeting_survives_quick_toggle() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.schedule_greeting(t0);
        controller.handle_control(ControlCommand::Toggle, at(t0, 500));
        controller.handle_control(ControlCommand::Toggle, at(t0, 1000));
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(controller.next_deadline(), Some(at(t0, 2000)));

        controller.fire_due_timers(at(t0, 2000));
        assert_eq!(log.spoken(), vec![replies::GREETING.to_string()]);
        assert!(log.is_playing());

        finish_speech(&mut controller, &log, at(t0, 6000));
        controller.fire_due_timers(at(t0, 10_000));
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(log.starts(), 1);
    }

    #[test]
    fn test_deactivate_while_speaking_cancels_playback() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        hear(&mut controller, "hello talha", at(t0, 1000));
        assert!(log.is_playing());

        controller.handle_control(ControlCommand::Deactivate, at(t0, 1200));

        assert_eq!(log.cancels(), 1);
        assert!(!log.is_playing());
        assert!(!controller.adapter().is_speaking());
        assert_eq!(controller.state(at(t0, 1200)), AssistantState::Idle);
    }

    #[test]
    fn test_state_changes_broadcast() {
        let (mut controller, log, mut rx) = create_controller();
        let t0 = Instant::now();

        controller.handle_control(ControlCommand::Toggle, t0);
        hear(&mut controller, "hi talha", at(t0, 1000));
        finish_speech(&mut controller, &log, at(t0, 2000));

        let states: Vec<AssistantState> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                AssistantEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                AssistantState::WaitingForWakeWord,
                AssistantState::Speaking,
                AssistantState::CoolingDown,
            ]
        );
    }

    #[test]
    fn test_no_overlap_across_session() {
        let (mut controller, log, _) = create_controller();
        let t0 = Instant::now();

        wake(&mut controller, &log, t0);
        for (i, command) in ["what are his skills", "go to work", "toggle theme", "help"]
            .iter()
            .enumerate()
        {
            let base = 4000 + i as u64 * 5000;
            hear(&mut controller, command, at(t0, base));
            assert_exclusive(&controller, &log);
            controller.fire_due_timers(at(t0, base + 500));
            assert_exclusive(&controller, &log);
            finish_speech(&mut controller, &log, at(t0, base + 1000));
            controller.fire_due_timers(at(t0, base + 2700));
            assert_exclusive(&controller, &log);
            assert!(controller.adapter().is_listening());
        }
    }

    #[tokio::test]
    async fn test_run_handles_control_requests() {
        let (mut controller, log, _) = create_controller();
        let (control_tx, control_rx) = mpsc::channel(4);
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            controller.run(control_rx, speech_rx).await;
            controller
        });

        let (request, reply) = ControlRequest::new(ControlCommand::Toggle);
        control_tx.send(request).await.unwrap();
        assert!(reply.await.unwrap());

        drop(control_tx);
        drop(speech_tx);
        let controller = handle.await.unwrap();
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(log.starts(), 1);
    }
}
