//! Contracts between the lifecycle controller and the subsystems it
//! sequences. Commands are fire-and-forget: they return nothing and are
//! assumed to succeed.

use crate::participants::ParticipantHandle;
use crate::types::{Level, SessionNotification};

pub trait SpawnController {
    fn start(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
}

/// Countdown collaborator. Expiry is reported back by the owner through
/// `LifecycleController::on_timer_expired`.
pub trait TimerController {
    fn start(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Sets the remaining time policy for `level`.
    fn configure(&mut self, level: Level);
}

/// Applies a difficulty level to the pursuing agent.
pub trait DifficultyController {
    fn apply_level(&mut self, level: Level);
}

pub trait ParticipantRegistry {
    /// Ordered participants at the moment of the call.
    fn snapshot_participants(&self) -> Vec<ParticipantHandle>;
}

pub trait SessionObserver {
    fn notify(&mut self, notification: &SessionNotification);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionNotification),
{
    fn notify(&mut self, notification: &SessionNotification) {
        self(notification)
    }
}
