//! Fire-and-forget notifications: toasts, sounds and the particle effect.
//!
//! Nothing here returns an error to the caller. Sound failures (muted
//! terminal, no audio device) are logged at debug level and dropped, so a
//! broken side channel can never hold up or corrupt a state update.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::SoundError;
use crate::model::Severity;

/// Toast styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    /// Neutral information.
    Info,
    /// A requested action succeeded.
    Success,
    /// Something needs attention (alerts, lost connection).
    Warning,
    /// A request or handler failed.
    Error,
}

/// One on-screen notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    /// Identifier used for manual dismissal.
    pub id: u64,
    /// Styling.
    pub level: ToastLevel,
    /// Bold first line.
    pub title: String,
    /// Body text.
    pub message: String,
    #[serde(skip)]
    created: Instant,
}

/// Visible toasts, oldest first. Each expires after the queue's TTL.
#[derive(Debug)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    ttl: Duration,
    next_id: u64,
}

impl ToastQueue {
    /// Create a queue whose toasts live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            toasts: Vec::new(),
            ttl,
            next_id: 1,
        }
    }

    /// Show a toast created at `now`; returns its id.
    pub fn push(&mut self, level: ToastLevel, title: &str, message: &str, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            level,
            title: title.to_string(),
            message: message.to_string(),
            created: now,
        });
        id
    }

    /// Dismiss a toast before it expires. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    /// Dismiss the newest toast, if any.
    pub fn dismiss_latest(&mut self) -> Option<u64> {
        self.toasts.pop().map(|t| t.id)
    }

    /// Drop toasts older than the TTL. Returns how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.toasts.len();
        self.toasts
            .retain(|t| now.saturating_duration_since(t.created) < ttl);
        before - self.toasts.len()
    }

    /// Toasts currently visible.
    pub fn active(&self) -> &[Toast] {
        &self.toasts
    }
}

/// Sounds the dashboard can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    /// Alert chime, pitched by severity.
    Alert(Severity),
    /// Stream connected.
    Connected,
    /// Stream lost.
    Disconnected,
    /// Request succeeded.
    Success,
    /// Something failed.
    Error,
}

/// Audio output. Implementations may fail; the notifier swallows failures.
pub trait SoundPlayer {
    /// Play one cue.
    fn play(&mut self, cue: SoundCue) -> Result<(), SoundError>;
}

/// Why the particle effect fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationReason {
    /// A CRITICAL alert arrived.
    CriticalAlert,
    /// The server pushed a `celebration` event.
    ServerRequest,
    /// The user navigated to the main view.
    Navigation,
}

/// Side channel the dispatcher reports to. Methods never fail.
pub trait NotificationSink {
    /// Show a toast.
    fn toast(&mut self, level: ToastLevel, title: &str, message: &str);

    /// Play a sound, best effort.
    fn sound(&mut self, cue: SoundCue);

    /// Fire the particle effect.
    fn celebrate(&mut self, reason: CelebrationReason);
}

/// Default sink: toast queue, optional sound player and a pending
/// particle effect for the next render.
pub struct Notifier {
    toasts: ToastQueue,
    player: Option<Box<dyn SoundPlayer>>,
    pending_celebration: Option<CelebrationReason>,
    celebrations: u64,
    sound_failures: u64,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("toasts", &self.toasts)
            .field("sound", &self.player.is_some())
            .field("pending_celebration", &self.pending_celebration)
            .field("celebrations", &self.celebrations)
            .field("sound_failures", &self.sound_failures)
            .finish()
    }
}

impl Notifier {
    /// Create a notifier. Pass `None` to disable sound.
    pub fn new(toast_ttl: Duration, player: Option<Box<dyn SoundPlayer>>) -> Self {
        Self {
            toasts: ToastQueue::new(toast_ttl),
            player,
            pending_celebration: None,
            celebrations: 0,
            sound_failures: 0,
        }
    }

    /// Visible toasts.
    pub fn toasts(&self) -> &[Toast] {
        self.toasts.active()
    }

    /// Mutable access for dismissal and expiry.
    pub fn toast_queue(&mut self) -> &mut ToastQueue {
        &mut self.toasts
    }

    /// Take the particle effect requested since the last render.
    pub fn take_celebration(&mut self) -> Option<CelebrationReason> {
        self.pending_celebration.take()
    }

    /// Particle effects fired so far.
    pub fn celebration_count(&self) -> u64 {
        self.celebrations
    }

    /// Sound cues that failed to play.
    pub fn sound_failures(&self) -> u64 {
        self.sound_failures
    }
}

impl NotificationSink for Notifier {
    fn toast(&mut self, level: ToastLevel, title: &str, message: &str) {
        self.toasts.push(level, title, message, Instant::now());
    }

    fn sound(&mut self, cue: SoundCue) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        if let Err(e) = player.play(cue) {
            self.sound_failures += 1;
            tracing::debug!(?cue, error = %e, "sound playback failed, ignoring");
        }
    }

    fn celebrate(&mut self, reason: CelebrationReason) {
        self.celebrations += 1;
        self.pending_celebration = Some(reason);
    }
}

/// Toast title and body for an accident alert.
pub fn alert_toast_text(severity: Severity, label: &str, confidence_pct: f64, location: Option<&str>) -> (String, String) {
    let title = format!("{} {} accident detected", severity.icon(), label.to_uppercase());
    let mut message = format!("Confidence {confidence_pct:.1}%");
    if let Some(location) = location {
        message.push_str(" at ");
        message.push_str(location);
    }
    (title, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BlockedPlayer;

    impl SoundPlayer for BlockedPlayer {
        fn play(&mut self, _cue: SoundCue) -> Result<(), SoundError> {
            Err(SoundError::Blocked("autoplay disabled".to_string()))
        }
    }

    #[test]
    fn test_toast_expires_after_ttl() {
        let start = Instant::now();
        let mut queue = ToastQueue::new(Duration::from_secs(5));
        queue.push(ToastLevel::Info, "a", "first", start);
        queue.push(ToastLevel::Info, "b", "second", start + Duration::from_secs(3));

        assert_eq!(queue.expire(start + Duration::from_millis(4999)), 0);
        assert_eq!(queue.expire(start + Duration::from_secs(5)), 1);
        assert_eq!(queue.active().len(), 1);
        assert_eq!(queue.active()[0].message, "second");
        assert_eq!(queue.expire(start + Duration::from_secs(8)), 1);
        assert!(queue.active().is_empty());
    }

    #[test]
    fn test_toast_manual_dismiss() {
        let now = Instant::now();
        let mut queue = ToastQueue::new(Duration::from_secs(5));
        let first = queue.push(ToastLevel::Warning, "a", "a", now);
        let second = queue.push(ToastLevel::Warning, "b", "b", now);
        assert!(queue.dismiss(first));
        assert!(!queue.dismiss(first));
        assert_eq!(queue.dismiss_latest(), Some(second));
        assert!(queue.active().is_empty());
    }

    #[test]
    fn test_sound_failure_is_swallowed() {
        let mut notifier = Notifier::new(Duration::from_secs(5), Some(Box::new(BlockedPlayer)));
        notifier.sound(SoundCue::Alert(Severity::Critical));
        notifier.sound(SoundCue::Connected);
        assert_eq!(notifier.sound_failures(), 2);
        assert!(notifier.toasts().is_empty());
    }

    #[test]
    fn test_celebration_is_taken_once() {
        let mut notifier = Notifier::new(Duration::from_secs(5), None);
        notifier.celebrate(CelebrationReason::CriticalAlert);
        assert_eq!(notifier.take_celebration(), Some(CelebrationReason::CriticalAlert));
        assert_eq!(notifier.take_celebration(), None);
        assert_eq!(notifier.celebration_count(), 1);
    }

    #[test]
    fn test_alert_toast_text() {
        let (title, message) = alert_toast_text(Severity::Major, "major", 88.26, Some("Camera-3"));
        assert_eq!(title, "🚑 MAJOR accident detected");
        assert_eq!(message, "Confidence 88.3% at Camera-3");
    }
}
