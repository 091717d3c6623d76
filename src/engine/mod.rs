use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver};

use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::chaser::ChaserAgent;
use crate::constants::{COLLECTION_THRESHOLD, TICK_RATE};
use crate::countdown::CountdownTimer;
use crate::error::{EngineError, SessionError};
use crate::participants::{ParticipantHandle, Roster};
use crate::session::{LifecycleController, SessionConfig};
use crate::spawner::CoinSpawner;
use crate::types::{
    CoinView, GameConfig, GameOverReason, Level, RuntimeEvent, ScoreEntry, SessionNotification,
    SessionSnapshot, SessionState, SessionSummary, StartPlayer, TimelineEvent,
};

mod ai_system;
mod utils;

use self::utils::now_ms;

const PROGRESS_MILESTONES: [u64; 3] = [25, 50, 75];

pub type SessionController = LifecycleController<CountdownTimer, CoinSpawner, ChaserAgent>;

#[derive(Clone, Debug)]
struct ParticipantInternal {
    handle: ParticipantHandle,
    reconnect_token: String,
    connected: bool,
    ai: bool,
    ai_think_at: u64,
}

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub time_limit_ms_override: Option<u64>,
    pub collection_threshold: u32,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            time_limit_ms_override: None,
            collection_threshold: COLLECTION_THRESHOLD,
        }
    }
}

pub struct GameEngine {
    pub started_at_ms: u64,
    pub config: GameConfig,

    seed: u32,
    rng: StdRng,
    roster: Roster,
    participants: Vec<ParticipantInternal>,
    controller: SessionController,
    notifications: Receiver<SessionNotification>,
    events: Vec<RuntimeEvent>,
    timeline: Vec<TimelineEvent>,
    milestone_emitted: HashSet<u64>,

    elapsed_ms: u64,
    tick_counter: u64,
    restart_requested: bool,
}

impl GameEngine {
    pub fn new(
        start_players: Vec<StartPlayer>,
        level: Level,
        seed: u32,
        options: GameEngineOptions,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(u64::from(seed));
        let mut roster = Roster::new();
        let mut participants = Vec::new();
        for start in &start_players {
            let handle = roster.join(start.id.clone(), start.name.clone());
            participants.push(ParticipantInternal {
                handle,
                reconnect_token: start.reconnect_token.clone(),
                connected: start.connected,
                ai: !start.connected,
                ai_think_at: rng.random_range(100..=300),
            });
        }

        let session_config = SessionConfig {
            collection_threshold: options.collection_threshold,
            expected_participants: start_players.len(),
        };
        let timer = CountdownTimer::new(level, options.time_limit_ms_override);
        let spawner = CoinSpawner::new(rng.random::<u64>());
        let chaser = ChaserAgent::new(level);
        let mut controller = LifecycleController::new(session_config, timer, spawner, chaser);

        let (tx, notifications) = mpsc::channel();
        controller.subscribe(move |notification: &SessionNotification| {
            // The receiver lives as long as the engine that owns the controller.
            let _ = tx.send(notification.clone());
        });
        // A fresh controller is never terminal.
        let _ = controller.configure_difficulty(level);

        let config = GameConfig {
            tick_rate: TICK_RATE,
            collection_threshold: options.collection_threshold,
            time_limit_ms: controller.timer().limit_ms(),
            chaser_speed: controller.difficulty().speed(),
            level,
        };

        Self {
            started_at_ms: now_ms(),
            config,
            seed,
            rng,
            roster,
            participants,
            controller,
            notifications,
            events: Vec::new(),
            timeline: Vec::new(),
            milestone_emitted: HashSet::new(),
            elapsed_ms: 0,
            tick_counter: 0,
            restart_requested: false,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn is_ended(&self) -> bool {
        self.controller.state().is_terminal()
    }

    pub fn outcome(&self) -> Option<GameOverReason> {
        self.controller.outcome()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.participant_index(player_id).is_some()
    }

    pub fn get_reconnect_token(&self, player_id: &str) -> Option<String> {
        self.participant_index(player_id)
            .map(|idx| self.participants[idx].reconnect_token.clone())
    }

    /// Disconnected participants keep playing under AI control.
    pub fn set_player_connection(&mut self, player_id: &str, connected: bool) {
        if let Some(idx) = self.participant_index(player_id) {
            self.participants[idx].connected = connected;
            self.participants[idx].ai = !connected;
        }
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.controller.start_session(&self.roster)?;
        self.started_at_ms = now_ms();
        self.drain_notifications();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        let result = self.controller.pause_session();
        self.drain_notifications();
        result
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        let result = self.controller.resume_session();
        self.drain_notifications();
        result
    }

    pub fn configure_difficulty(&mut self, level: Level) -> Result<(), SessionError> {
        self.controller.configure_difficulty(level)?;
        self.config.level = level;
        self.config.time_limit_ms = self.controller.timer().limit_ms();
        self.config.chaser_speed = self.controller.difficulty().speed();
        Ok(())
    }

    pub fn request_restart(&mut self) {
        self.controller.restart_session();
        self.drain_notifications();
    }

    /// A connected participant picked up `coin_id`.
    pub fn collect_coin(&mut self, player_id: &str, coin_id: &str) -> Result<(), EngineError> {
        let state = self.controller.state();
        if state != SessionState::Playing {
            return Err(SessionError::NotPlaying { state }.into());
        }
        let Some(idx) = self.participant_index(player_id) else {
            return Err(EngineError::UnknownParticipant {
                id: player_id.to_string(),
            });
        };
        let handle = self.participants[idx].handle.clone();
        if !handle.is_alive() {
            return Err(EngineError::ParticipantEliminated {
                id: player_id.to_string(),
            });
        }
        let Some(coin) = self.controller.spawner_mut().take(coin_id) else {
            return Err(EngineError::CoinNotFound {
                id: coin_id.to_string(),
            });
        };

        self.apply_pickup(&handle, coin);
        self.drain_notifications();
        Ok(())
    }

    pub fn step(&mut self, dt_ms: u64) {
        let state = self.controller.state();
        if state == SessionState::NotStarted || state.is_terminal() {
            return;
        }
        self.tick_counter += 1;

        for coin in self.controller.spawner_mut().update(dt_ms) {
            self.events.push(RuntimeEvent::CoinSpawned { coin });
        }
        if state == SessionState::Playing {
            self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
            self.update_ai_participants();
            self.update_chaser(dt_ms);
        }
        if self.controller.timer_mut().update(dt_ms) {
            self.controller.on_timer_expired();
        }
        self.drain_notifications();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> SessionSnapshot {
        let snapshot = SessionSnapshot {
            tick: self.tick_counter,
            now_ms: self.started_at_ms + self.elapsed_ms,
            state: self.controller.state(),
            level: self.controller.level(),
            time_left_ms: self.controller.timer().remaining_ms(),
            total_collected: self.total_collected(),
            collection_threshold: self.config.collection_threshold,
            alive_count: self.alive_count(),
            participants: self
                .participants
                .iter()
                .map(|participant| participant.handle.view())
                .collect(),
            coins: self.controller.spawner().coins().to_vec(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
            timeline: self
                .timeline
                .iter()
                .rev()
                .take(24)
                .cloned()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect(),
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> SessionSummary {
        let mut ranking: Vec<ScoreEntry> = self
            .participants
            .iter()
            .map(|participant| ScoreEntry {
                participant_id: participant.handle.id().to_string(),
                name: participant.handle.name().to_string(),
                collected: participant.handle.collected_count(),
                alive: participant.handle.is_alive(),
            })
            .collect();
        ranking.sort_by(|a, b| b.collected.cmp(&a.collected));

        SessionSummary {
            reason: self.controller.outcome(),
            state: self.controller.state(),
            duration_ms: self.elapsed_ms,
            total_collected: self.total_collected(),
            collection_threshold: self.config.collection_threshold,
            ended_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            timeline: self.timeline.clone(),
            ranking,
        }
    }

    fn total_collected(&self) -> u64 {
        self.participants
            .iter()
            .map(|participant| u64::from(participant.handle.collected_count()))
            .sum()
    }

    fn alive_count(&self) -> usize {
        if self.controller.state() == SessionState::NotStarted {
            return self.participants.len();
        }
        self.controller.alive_count()
    }

    fn participant_index(&self, player_id: &str) -> Option<usize> {
        self.participants
            .iter()
            .position(|participant| participant.handle.id() == player_id)
    }

    fn apply_pickup(&mut self, handle: &ParticipantHandle, coin: CoinView) {
        handle.add_collected(1);
        self.events.push(RuntimeEvent::CoinCollected {
            coin_id: coin.id,
            by: handle.id().to_string(),
            total: self.total_collected(),
        });
        self.controller.on_collection_event();
    }

    fn drain_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            match &notification {
                SessionNotification::ItemCollected { total } => {
                    self.record_milestones(*total);
                }
                SessionNotification::RestartRequested => {
                    self.restart_requested = true;
                    self.push_timeline("restart requested".to_string());
                }
                other => {
                    let label = timeline_label(other);
                    self.push_timeline(label);
                }
            }
            self.events.push(RuntimeEvent::Lifecycle { notification });
        }
    }

    fn record_milestones(&mut self, total: u64) {
        let threshold = u64::from(self.config.collection_threshold.max(1));
        let percent = total.saturating_mul(100) / threshold;
        for milestone in PROGRESS_MILESTONES {
            if percent >= milestone && self.milestone_emitted.insert(milestone) {
                debug!(milestone, total, "collection milestone reached");
                self.push_timeline(format!("collection {milestone}%"));
            }
        }
    }

    fn push_timeline(&mut self, label: String) {
        self.timeline.push(TimelineEvent {
            at_ms: self.elapsed_ms,
            label,
        });
    }
}

fn timeline_label(notification: &SessionNotification) -> String {
    match notification {
        SessionNotification::SessionStarted { participant_count } => {
            format!("session started ({participant_count} participants)")
        }
        SessionNotification::ItemCollected { total } => format!("collected {total}"),
        SessionNotification::Paused => "paused".to_string(),
        SessionNotification::Resumed => "resumed".to_string(),
        SessionNotification::Victory => "victory".to_string(),
        SessionNotification::Defeat { reason } => match reason {
            GameOverReason::TimeUp => "time up".to_string(),
            GameOverReason::AllCaught => "everyone was caught".to_string(),
            GameOverReason::Victory => "victory".to_string(),
        },
        SessionNotification::RestartRequested => "restart requested".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;

    fn make_players(count: usize, connected: bool) -> Vec<StartPlayer> {
        (0..count)
            .map(|idx| StartPlayer {
                id: format!("p{}", idx + 1),
                name: format!("P{}", idx + 1),
                reconnect_token: format!("token-{}", idx + 1),
                connected,
            })
            .collect()
    }

    fn make_engine(count: usize, connected: bool, level: Level, time_limit_ms: u64) -> GameEngine {
        GameEngine::new(
            make_players(count, connected),
            level,
            1234,
            GameEngineOptions {
                time_limit_ms_override: Some(time_limit_ms),
                ..GameEngineOptions::default()
            },
        )
    }

    fn run_to_end(engine: &mut GameEngine) {
        let mut safety = 0;
        while !engine.is_ended() {
            engine.step(TICK_MS);
            safety += 1;
            assert!(safety < 20 * 60 * 5, "session did not end");
        }
    }

    fn count_lifecycle(events: &[RuntimeEvent], wanted: &SessionNotification) -> usize {
        events
            .iter()
            .filter(|event| {
                matches!(event, RuntimeEvent::Lifecycle { notification } if notification == wanted)
            })
            .count()
    }

    #[test]
    fn engine_is_inert_before_start() {
        let mut engine = make_engine(2, false, Level::Normal, 60_000);
        for _ in 0..100 {
            engine.step(TICK_MS);
        }
        let snapshot = engine.build_snapshot(true);
        assert_eq!(snapshot.state, SessionState::NotStarted);
        assert_eq!(snapshot.tick, 0);
        assert!(snapshot.coins.is_empty());
        assert_eq!(snapshot.alive_count, 2);
        assert_eq!(snapshot.time_left_ms, 60_000);
    }

    #[test]
    fn same_seed_produces_same_outcome() {
        let mut a = make_engine(2, false, Level::Normal, 60_000);
        let mut b = make_engine(2, false, Level::Normal, 60_000);
        a.start().expect("start a");
        b.start().expect("start b");
        run_to_end(&mut a);
        run_to_end(&mut b);

        assert_eq!(a.outcome(), b.outcome());
        assert_eq!(a.elapsed_ms(), b.elapsed_ms());
        let sa = a.build_summary();
        let sb = b.build_summary();
        assert_eq!(sa.total_collected, sb.total_collected);
        let ra: Vec<u32> = sa.ranking.iter().map(|entry| entry.collected).collect();
        let rb: Vec<u32> = sb.ranking.iter().map(|entry| entry.collected).collect();
        assert_eq!(ra, rb);
    }

    #[test]
    fn ai_participants_collect_to_victory_on_easy() {
        let mut engine = make_engine(2, false, Level::Easy, 120_000);
        engine.start().expect("start");
        run_to_end(&mut engine);

        assert_eq!(engine.outcome(), Some(GameOverReason::Victory));
        let summary = engine.build_summary();
        assert_eq!(summary.state, SessionState::Won);
        assert!(summary.total_collected >= 50);
        assert!(summary.ranking[0].collected >= summary.ranking[1].collected);
    }

    #[test]
    fn idle_participants_run_out_of_time() {
        let mut engine = make_engine(2, true, Level::Normal, 1_000);
        engine.start().expect("start");
        run_to_end(&mut engine);

        assert_eq!(engine.outcome(), Some(GameOverReason::TimeUp));
        assert_eq!(engine.state(), SessionState::Lost);
        let snapshot = engine.build_snapshot(true);
        assert_eq!(snapshot.time_left_ms, 0);
        assert!(snapshot.coins.is_empty());
        assert!(snapshot.participants.iter().all(|p| !p.active));
        assert_eq!(
            count_lifecycle(
                &snapshot.events,
                &SessionNotification::Defeat {
                    reason: GameOverReason::TimeUp
                }
            ),
            1
        );
    }

    #[test]
    fn chaser_catching_everyone_loses() {
        let mut engine = make_engine(2, true, Level::Hard, 120_000);
        engine.start().expect("start");
        run_to_end(&mut engine);

        assert_eq!(engine.outcome(), Some(GameOverReason::AllCaught));
        let snapshot = engine.build_snapshot(true);
        assert_eq!(snapshot.alive_count, 0);
        let caught = snapshot
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::ParticipantCaught { .. }))
            .count();
        assert_eq!(caught, 2);
    }

    #[test]
    fn collect_coin_validates_input() {
        let mut engine = make_engine(2, true, Level::Easy, 60_000);
        assert!(matches!(
            engine.collect_coin("p1", "coin_1"),
            Err(EngineError::Session(SessionError::NotPlaying {
                state: SessionState::NotStarted
            }))
        ));

        engine.start().expect("start");
        for _ in 0..20 {
            engine.step(TICK_MS);
        }
        let coin_id = engine.controller().spawner().coins()[0].id.clone();

        assert_eq!(
            engine.collect_coin("nobody", &coin_id),
            Err(EngineError::UnknownParticipant {
                id: "nobody".to_string()
            })
        );
        assert_eq!(
            engine.collect_coin("p1", "coin_missing"),
            Err(EngineError::CoinNotFound {
                id: "coin_missing".to_string()
            })
        );

        engine.collect_coin("p1", &coin_id).expect("collect");
        assert_eq!(engine.controller().total_collected(), 1);
        assert_eq!(
            engine.collect_coin("p2", &coin_id),
            Err(EngineError::CoinNotFound { id: coin_id })
        );
    }

    #[test]
    fn pause_freezes_timer_spawner_and_chaser() {
        let mut engine = make_engine(2, true, Level::Normal, 60_000);
        engine.start().expect("start");
        for _ in 0..10 {
            engine.step(TICK_MS);
        }
        engine.pause().expect("pause");
        let before = engine.build_snapshot(false);

        for _ in 0..20 * 30 {
            engine.step(TICK_MS);
        }
        let during = engine.build_snapshot(false);
        assert_eq!(during.state, SessionState::Paused);
        assert_eq!(during.time_left_ms, before.time_left_ms);
        assert_eq!(during.coins, before.coins);
        assert_eq!(during.alive_count, 2);
        assert_eq!(engine.elapsed_ms(), 10 * TICK_MS);

        engine.resume().expect("resume");
        engine.step(TICK_MS);
        let after = engine.build_snapshot(false);
        assert_eq!(after.time_left_ms, before.time_left_ms - TICK_MS);
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut engine = make_engine(2, false, Level::Normal, 60_000);
        engine.start().expect("start");
        for _ in 0..20 {
            engine.step(TICK_MS);
        }

        let kept = engine.build_snapshot(false);
        assert!(kept.events.is_empty());
        let drained = engine.build_snapshot(true);
        assert_eq!(
            count_lifecycle(
                &drained.events,
                &SessionNotification::SessionStarted {
                    participant_count: 2
                }
            ),
            1
        );
        assert!(engine.build_snapshot(true).events.is_empty());
    }

    #[test]
    fn restart_request_is_flagged_for_the_host() {
        let mut engine = make_engine(2, false, Level::Normal, 60_000);
        engine.start().expect("start");
        assert!(!engine.restart_requested());
        engine.request_restart();
        assert!(engine.restart_requested());
        assert_eq!(engine.state(), SessionState::Playing);
    }

    #[test]
    fn configure_difficulty_updates_config() {
        let mut engine = GameEngine::new(
            make_players(2, true),
            Level::Easy,
            7,
            GameEngineOptions::default(),
        );
        engine.configure_difficulty(Level::Hard).expect("configure");
        assert_eq!(engine.config.level, Level::Hard);
        assert_eq!(engine.config.time_limit_ms, 60_000);
        assert_eq!(engine.controller().difficulty().level(), Level::Hard);
    }

    #[test]
    fn disconnected_player_is_taken_over_by_ai() {
        let mut engine = make_engine(1, true, Level::Easy, 120_000);
        engine.set_player_connection("p1", false);
        engine.start().expect("start");
        run_to_end(&mut engine);
        assert!(engine.build_summary().ranking[0].collected > 0);
        assert_eq!(engine.get_reconnect_token("p1").as_deref(), Some("token-1"));
    }

    #[test]
    fn milestones_are_recorded_once() {
        let mut engine = make_engine(2, false, Level::Easy, 120_000);
        engine.start().expect("start");
        run_to_end(&mut engine);
        let summary = engine.build_summary();
        for label in ["collection 25%", "collection 50%", "collection 75%"] {
            let count = summary
                .timeline
                .iter()
                .filter(|event| event.label == label)
                .count();
            assert_eq!(count, 1, "{label}");
        }
    }
}
