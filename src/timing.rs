//! Cooperative timers driven by per-frame delta time.
//!
//! Every timer here is owned by a single preview instance and advanced from
//! its `update(dt)`; nothing is process-wide and nothing blocks.

/// Countdown timer - fires once after its duration, then goes inactive.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    duration: f32,
    elapsed: f32,
    active: bool,
}

impl Countdown {
    /// Create inactive countdown
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            elapsed: 0.0,
            active: false,
        }
    }

    /// Start (or restart) the countdown from zero
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.active = true;
    }

    /// Cancel without firing
    pub fn cancel(&mut self) {
        self.active = false;
        self.elapsed = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Tick with delta, returns true if completed
    pub fn tick(&mut self, delta: f32) -> bool {
        if !self.active {
            return false;
        }

        self.elapsed += delta;

        if self.elapsed >= self.duration {
            self.active = false;
            true
        } else {
            false
        }
    }
}

/// Outcome of advancing a [`RetrySchedule`] by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTick {
    /// Interval still running, or schedule not started.
    Waiting,
    /// An attempt is due now.
    Attempt,
}

/// Bounded fixed-interval retry schedule.
///
/// Models the "geometry may attach late" workaround: a first attempt after
/// one interval, then further attempts at the same interval until either the
/// caller calls [`Self::stop`] on success or every attempt has fired.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    interval: Countdown,
    max_attempts: u32,
    attempts: u32,
}

impl RetrySchedule {
    pub fn new(interval: f32, max_attempts: u32) -> Self {
        Self {
            interval: Countdown::new(interval),
            max_attempts,
            attempts: 0,
        }
    }

    /// Arm the schedule; the first attempt fires one interval from now.
    pub fn start(&mut self) {
        self.attempts = 0;
        self.interval.start();
    }

    /// Stop after a successful attempt (or on teardown).
    pub fn stop(&mut self) {
        self.interval.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_active()
    }

    /// Attempts performed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once every attempt has fired without [`stop`] being called.
    pub fn is_exhausted(&self) -> bool {
        !self.interval.is_active() && self.attempts >= self.max_attempts
    }

    pub fn tick(&mut self, delta: f32) -> RetryTick {
        if !self.interval.tick(delta) {
            return RetryTick::Waiting;
        }
        self.attempts += 1;
        if self.attempts < self.max_attempts {
            self.interval.start();
        }
        RetryTick::Attempt
    }
}

/// Trailing-edge debounce with a single pending slot.
///
/// Values queued inside the window overwrite each other; one window after the
/// first queue, the latest value is released. Owned per preview instance —
/// two previews never share a window.
#[derive(Debug, Clone, Copy)]
pub struct Debounce<T: Copy> {
    window: Countdown,
    pending: Option<T>,
}

impl<T: Copy> Debounce<T> {
    pub fn new(window: f32) -> Self {
        Self {
            window: Countdown::new(window),
            pending: None,
        }
    }

    /// Queue a value; overwrites any value already pending.
    pub fn queue(&mut self, value: T) {
        self.pending = Some(value);
        if !self.window.is_active() {
            self.window.start();
        }
    }

    /// Drop the pending value and stop the window.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.window.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the settled value once the window elapses.
    pub fn tick(&mut self, delta: f32) -> Option<T> {
        if self.window.tick(delta) {
            self.pending.take()
        } else {
            None
        }
    }
}
