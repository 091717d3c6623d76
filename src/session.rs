//! Session lifecycle controller.
//!
//! The controller owns the session state machine
//! (`NotStarted -> Playing <-> Paused -> Won | Lost`), aggregates the
//! participants' collected items, and sequences the timer, spawner and
//! pursuit difficulty collaborators. All handlers take `&mut self`, so a
//! host that delivers events from several threads must serialize them
//! (the server keeps the engine behind a mutex); under that exclusivity the
//! terminal guard in `end_session` is enough to make termination
//! exactly-once.

use tracing::{debug, info, warn};

use crate::collaborators::{
    DifficultyController, ParticipantRegistry, SessionObserver, SpawnController, TimerController,
};
use crate::constants::{COLLECTION_THRESHOLD, DEFAULT_PARTICIPANT_COUNT};
use crate::error::SessionError;
use crate::participants::ParticipantHandle;
use crate::types::{GameOverReason, Level, SessionNotification, SessionState};

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Summed collected items that end the session in victory.
    pub collection_threshold: u32,
    /// Participant count the session is designed for. The alive counter
    /// always follows the snapshot size; a mismatch is only logged.
    pub expected_participants: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            collection_threshold: COLLECTION_THRESHOLD,
            expected_participants: DEFAULT_PARTICIPANT_COUNT,
        }
    }
}

pub struct LifecycleController<T, S, D> {
    config: SessionConfig,
    state: SessionState,
    level: Level,
    participants: Vec<ParticipantHandle>,
    alive_count: usize,
    outcome: Option<GameOverReason>,
    timer: T,
    spawner: S,
    difficulty: D,
    observers: Vec<Box<dyn SessionObserver + Send>>,
}

impl<T, S, D> LifecycleController<T, S, D>
where
    T: TimerController,
    S: SpawnController,
    D: DifficultyController,
{
    pub fn new(config: SessionConfig, timer: T, spawner: S, difficulty: D) -> Self {
        Self {
            config,
            state: SessionState::NotStarted,
            level: Level::Normal,
            participants: Vec::new(),
            alive_count: 0,
            outcome: None,
            timer,
            spawner,
            difficulty,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl SessionObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub fn outcome(&self) -> Option<GameOverReason> {
        self.outcome
    }

    /// Participants captured by `start_session`; empty before the start.
    pub fn participants(&self) -> &[ParticipantHandle] {
        &self.participants
    }

    pub fn total_collected(&self) -> u64 {
        self.participants
            .iter()
            .map(|participant| u64::from(participant.collected_count()))
            .sum()
    }

    /// Victory is collective: every snapshotted participant wins.
    pub fn winning_participants(&self) -> &[ParticipantHandle] {
        if self.state == SessionState::Won {
            &self.participants
        } else {
            &[]
        }
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn spawner_mut(&mut self) -> &mut S {
        &mut self.spawner
    }

    pub fn difficulty(&self) -> &D {
        &self.difficulty
    }

    pub fn difficulty_mut(&mut self) -> &mut D {
        &mut self.difficulty
    }

    /// Takes the participant snapshot and starts the spawner and timer.
    ///
    /// The snapshot is taken exactly once; later calls are rejected with
    /// [`SessionError::AlreadyStarted`] and leave it untouched.
    pub fn start_session<R>(&mut self, registry: &R) -> Result<(), SessionError>
    where
        R: ParticipantRegistry + ?Sized,
    {
        if self.state != SessionState::NotStarted {
            return Err(self.rejected("start_session", SessionError::AlreadyStarted));
        }

        let participants = registry.snapshot_participants();
        if participants.is_empty() {
            warn!("start_session rejected: registry returned no participants");
            return Err(SessionError::NoParticipants);
        }
        if participants.len() != self.config.expected_participants {
            warn!(
                expected = self.config.expected_participants,
                actual = participants.len(),
                "participant snapshot differs from expected count; alive count follows the snapshot"
            );
        }

        self.alive_count = participants.len();
        self.participants = participants;
        self.state = SessionState::Playing;
        self.spawner.start();
        self.timer.start();

        info!(
            participants = self.alive_count,
            threshold = self.config.collection_threshold,
            level = ?self.level,
            "session started"
        );
        self.notify(SessionNotification::SessionStarted {
            participant_count: self.alive_count,
        });
        Ok(())
    }

    /// Forwards `level` to the timer and the pursuing agent.
    pub fn configure_difficulty(&mut self, level: Level) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            let state = self.state;
            return Err(self.rejected("configure_difficulty", SessionError::Terminal { state }));
        }
        self.level = level;
        self.timer.configure(level);
        self.difficulty.apply_level(level);
        info!(?level, state = ?self.state, "difficulty configured");
        Ok(())
    }

    /// Called whenever any participant's collected count changes.
    ///
    /// Returns the outcome only for the call that ended the session.
    pub fn on_collection_event(&mut self) -> Option<GameOverReason> {
        if self.state != SessionState::Playing {
            debug!(state = ?self.state, "collection event ignored");
            return None;
        }

        let total = self.total_collected();
        self.notify(SessionNotification::ItemCollected { total });
        if total >= u64::from(self.config.collection_threshold) {
            return self.end_session(GameOverReason::Victory);
        }
        None
    }

    /// Called when the pursuing agent catches a participant.
    pub fn on_participant_eliminated(&mut self) -> Option<GameOverReason> {
        if self.state == SessionState::NotStarted || self.state.is_terminal() {
            debug!(state = ?self.state, "elimination ignored");
            return None;
        }

        self.alive_count = self.alive_count.saturating_sub(1);
        info!(alive = self.alive_count, "participant eliminated");
        if self.alive_count == 0 && self.state == SessionState::Playing {
            return self.end_session(GameOverReason::AllCaught);
        }
        None
    }

    pub fn on_timer_expired(&mut self) -> Option<GameOverReason> {
        if self.state != SessionState::Playing {
            debug!(state = ?self.state, "timer expiry ignored");
            return None;
        }
        self.end_session(GameOverReason::TimeUp)
    }

    pub fn pause_session(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Playing => {}
            SessionState::NotStarted => {
                return Err(self.rejected("pause_session", SessionError::NotStarted));
            }
            state if state.is_terminal() => {
                return Err(self.rejected("pause_session", SessionError::Terminal { state }));
            }
            state => {
                return Err(self.rejected("pause_session", SessionError::NotPlaying { state }));
            }
        }

        self.timer.pause();
        self.spawner.pause();
        self.state = SessionState::Paused;
        info!("session paused");
        self.notify(SessionNotification::Paused);
        Ok(())
    }

    /// Resumes a paused session. Eliminations or collections that arrived
    /// while paused are evaluated right after the resume.
    pub fn resume_session(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Paused => {}
            SessionState::NotStarted => {
                return Err(self.rejected("resume_session", SessionError::NotStarted));
            }
            state if state.is_terminal() => {
                return Err(self.rejected("resume_session", SessionError::Terminal { state }));
            }
            state => {
                return Err(self.rejected("resume_session", SessionError::NotPaused { state }));
            }
        }

        self.timer.resume();
        self.spawner.resume();
        self.state = SessionState::Playing;
        info!("session resumed");
        self.notify(SessionNotification::Resumed);
        self.settle_deferred_outcome();
        Ok(())
    }

    /// Asks the owning environment to build a fresh session. This
    /// controller is not reset; it is expected to be dropped.
    pub fn restart_session(&mut self) {
        info!(state = ?self.state, "restart requested");
        self.notify(SessionNotification::RestartRequested);
    }

    fn settle_deferred_outcome(&mut self) -> Option<GameOverReason> {
        if self.total_collected() >= u64::from(self.config.collection_threshold) {
            return self.end_session(GameOverReason::Victory);
        }
        if self.alive_count == 0 {
            return self.end_session(GameOverReason::AllCaught);
        }
        None
    }

    /// Single exit path for both outcomes. Subsystems are stopped before the
    /// state flips and before observers hear about it.
    fn end_session(&mut self, reason: GameOverReason) -> Option<GameOverReason> {
        if self.state.is_terminal() {
            debug!(?reason, state = ?self.state, "terminal transition dropped");
            return None;
        }

        self.timer.stop();
        self.spawner.stop();
        for participant in &self.participants {
            participant.deactivate();
        }
        self.state = reason.terminal_state();
        self.outcome = Some(reason);

        info!(
            reason = reason.key(),
            total = self.total_collected(),
            alive = self.alive_count,
            "session ended"
        );
        let notification = match reason {
            GameOverReason::Victory => SessionNotification::Victory,
            reason => SessionNotification::Defeat { reason },
        };
        self.notify(notification);
        Some(reason)
    }

    fn rejected(&self, operation: &'static str, error: SessionError) -> SessionError {
        debug!(operation, state = ?self.state, %error, "lifecycle operation rejected");
        error
    }

    fn notify(&mut self, notification: SessionNotification) {
        for observer in &mut self.observers {
            observer.notify(&notification);
        }
    }
}
