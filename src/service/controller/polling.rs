//! Typing-aware refresh suppression
//!
//! Polling is `Paused` while a bid field holds focus, until the typing
//! cooldown passes after the last keystroke, and for a short grace period
//! after a bid field loses focus (so tabbing from one bid field to another
//! does not let a refresh slip in). Otherwise it is `Active`.
//!
//! Everything is expressed as deadlines checked against the time of the
//! question, so there are no timers to cancel.
use std::time::{Duration, Instant};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::debug;

use crate::view::{InputKey, InputKeyRef, RefreshStatus};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypingState {
    /// Bid field holding focus
    focused: Option<InputKey>,
    cooldown_until: Option<Instant>,
    blur_settles_at: Option<Instant>,
}

#[derive(Clone, Debug)]
pub struct PollingController {
    typing: TypingState,
    typing_cooldown: Duration,
    blur_grace: Duration,
}

impl PollingController {
    pub fn new(typing_cooldown: Duration, blur_grace: Duration) -> Self {
        Self {
            typing: TypingState::default(),
            typing_cooldown,
            blur_grace,
        }
    }

    pub fn focus_in(&mut self, key: InputKeyRef) {
        self.typing.focused = Some(key.to_owned());
        self.typing.blur_settles_at = None;
    }

    pub fn input(&mut self, now: Instant) {
        self.typing.cooldown_until = Some(now + self.typing_cooldown);
    }

    pub fn focus_out(&mut self, key: InputKeyRef, now: Instant) {
        if self.typing.focused.as_deref() == Some(key) {
            self.typing.focused = None;
        }
        // once focus has settled away from every bid field, polling resumes
        // without waiting out the typing cooldown
        self.typing.cooldown_until = None;
        self.typing.blur_settles_at = Some(now + self.blur_grace);
    }

    /// The bid field polling considers focused
    pub fn focused(&self) -> Option<InputKeyRef<'_>> {
        self.typing.focused.as_deref()
    }

    pub fn status(&self, now: Instant) -> RefreshStatus {
        let pending = |deadline: Option<Instant>| deadline.map(|at| now < at).unwrap_or(false);

        if self.typing.focused.is_some()
            || pending(self.typing.cooldown_until)
            || pending(self.typing.blur_settles_at)
        {
            RefreshStatus::Paused
        } else {
            RefreshStatus::Active
        }
    }

    pub fn is_paused(&self, now: Instant) -> bool {
        self.status(now) == RefreshStatus::Paused
    }
}

/// The one refresh timer
///
/// Keeps ticking at a fixed period once started, whatever the polling state;
/// a tick that should not fetch is simply ignored by the controller.
pub struct PollTimer {
    period: Duration,
    interval: Option<Interval>,
}

impl PollTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Start ticking, replacing any previously started timer
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("restarting refresh timer");
        }
        let mut interval = time::interval_at(time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick; never completes if the timer was not started
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}
