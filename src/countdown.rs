use crate::collaborators::TimerController;
use crate::constants::get_time_limit_ms;
use crate::types::Level;

/// Tick-driven countdown. Pausing only flips a local flag consulted by
/// [`CountdownTimer::update`]; nothing else in the process slows down.
#[derive(Clone, Debug)]
pub struct CountdownTimer {
    limit_override_ms: Option<u64>,
    limit_ms: u64,
    remaining_ms: u64,
    running: bool,
    paused: bool,
    expired: bool,
}

impl CountdownTimer {
    pub fn new(level: Level, limit_override_ms: Option<u64>) -> Self {
        let limit_ms = limit_override_ms.unwrap_or_else(|| get_time_limit_ms(level));
        Self {
            limit_override_ms,
            limit_ms,
            remaining_ms: limit_ms,
            running: false,
            paused: false,
            expired: false,
        }
    }

    pub fn limit_ms(&self) -> u64 {
        self.limit_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advances the countdown. Returns `true` exactly once, on the update
    /// that reaches zero.
    pub fn update(&mut self, dt_ms: u64) -> bool {
        if !self.running || self.paused || self.expired {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(dt_ms);
        if self.remaining_ms == 0 {
            self.expired = true;
            self.running = false;
            return true;
        }
        false
    }
}

impl TimerController for CountdownTimer {
    fn start(&mut self) {
        self.remaining_ms = self.limit_ms;
        self.running = true;
        self.paused = false;
        self.expired = false;
    }

    fn stop(&mut self) {
        self.running = false;
        self.paused = false;
    }

    fn pause(&mut self) {
        if self.running {
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn configure(&mut self, level: Level) {
        self.limit_ms = self
            .limit_override_ms
            .unwrap_or_else(|| get_time_limit_ms(level));
        self.remaining_ms = self.limit_ms;
    }
}
