use clap::Parser;
use coin_collector_rust_server::constants::TICK_MS;
use coin_collector_rust_server::engine::{GameEngine, GameEngineOptions};
use coin_collector_rust_server::types::{
    GameOverReason, Level, RuntimeEvent, SessionNotification, SessionSnapshot, SessionState,
    StartPlayer,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    ai: Option<i32>,
    #[arg(long)]
    seconds: Option<i32>,
    #[arg(long)]
    level: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    #[serde(rename = "aiPlayers")]
    ai_players: usize,
    seconds: i32,
    level: Level,
    seed: u32,
    #[serde(rename = "pauseAtMs")]
    pause_at_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    #[serde(rename = "aiPlayers")]
    ai_players: usize,
    seconds: i32,
    level: Level,
    reason: Option<GameOverReason>,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "totalCollected")]
    total_collected: u64,
    #[serde(rename = "coinsSpawned")]
    coins_spawned: u32,
    caught: u32,
    pauses: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Tracks what the previous snapshots promised so later ones can be checked
/// against the lifecycle rules.
#[derive(Debug)]
struct LifecycleWatch {
    participant_count: usize,
    time_limit_ms: u64,
    last_total: u64,
    last_alive: usize,
    terminal_notifications: u32,
    ended: bool,
}

impl LifecycleWatch {
    fn new(participant_count: usize, time_limit_ms: u64) -> Self {
        Self {
            participant_count,
            time_limit_ms,
            last_total: 0,
            last_alive: participant_count,
            terminal_notifications: 0,
            ended: false,
        }
    }

    fn check(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let mut anomalies = Vec::new();
        if snapshot.total_collected < self.last_total {
            anomalies.push(format!(
                "collected total decreased: {} -> {}",
                self.last_total, snapshot.total_collected
            ));
        }
        if snapshot.alive_count > self.last_alive {
            anomalies.push(format!(
                "alive count increased: {} -> {}",
                self.last_alive, snapshot.alive_count
            ));
        }
        if snapshot.alive_count > self.participant_count {
            anomalies.push(format!(
                "alive count above roster size: {}",
                snapshot.alive_count
            ));
        }
        if snapshot.time_left_ms > self.time_limit_ms {
            anomalies.push(format!("time left above limit: {}", snapshot.time_left_ms));
        }

        for event in &snapshot.events {
            let RuntimeEvent::Lifecycle { notification } = event else {
                continue;
            };
            if self.ended {
                anomalies.push(format!("notification after game over: {notification:?}"));
            }
            if matches!(
                notification,
                SessionNotification::Victory | SessionNotification::Defeat { .. }
            ) {
                self.terminal_notifications += 1;
                self.ended = true;
            }
        }
        if self.terminal_notifications > 1 {
            anomalies.push("game over announced more than once".to_string());
        }

        match snapshot.state {
            SessionState::Won
                if snapshot.total_collected < u64::from(snapshot.collection_threshold) =>
            {
                anomalies.push(format!(
                    "won below threshold: {}/{}",
                    snapshot.total_collected, snapshot.collection_threshold
                ));
            }
            SessionState::Won | SessionState::Lost if !snapshot.coins.is_empty() => {
                anomalies.push("coins remain after game over".to_string());
            }
            _ => {}
        }

        self.last_total = snapshot.total_collected;
        self.last_alive = snapshot.alive_count;
        anomalies
    }
}

fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            event = "scenario_started",
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            ai_players = scenario.ai_players,
            seconds = scenario.seconds,
            level = ?scenario.level
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                event = "anomaly_detected",
                match_id = %match_id,
                scenario = %scenario.name,
                seed = scenario.seed,
                tick = anomaly.tick,
                message = %anomaly.message
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ms += scenario_run.result.duration_ms;
        *reason_counts
            .entry(reason_key(scenario_run.result.reason).to_string())
            .or_insert(0) += 1;

        info!(
            event = "scenario_finished",
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            tick = scenario_run.finished_tick,
            reason = reason_key(scenario_run.result.reason),
            duration_ms = scenario_run.result.duration_ms,
            total_collected = scenario_run.result.total_collected,
            anomaly_count = scenario_run.anomaly_records.len()
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => error!(event = "result_serialize_failed", %error),
        }
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        reason_counts,
        total_anomalies,
        total_duration_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            error!(
                event = "summary_write_failed",
                match_id = %match_id,
                path = %path.display(),
                %error
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    info!(
        event = "run_finished",
        match_id = %match_id,
        scenario_count = summary.scenario_count,
        anomaly_count = summary.anomaly_count,
        average_duration_ms = summary.average_duration_ms,
        reason_counts = ?summary.reason_counts,
        summary_out = ?summary_out_written
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let mut start_players = Vec::new();
    for idx in 0..scenario.ai_players {
        start_players.push(StartPlayer {
            id: format!("ai_{}", idx + 1),
            name: format!("AI-{:02}", idx + 1),
            reconnect_token: format!("sim_{}_{}", scenario.seed, idx + 1),
            connected: false,
        });
    }

    let mut engine = GameEngine::new(
        start_players,
        scenario.level,
        scenario.seed,
        GameEngineOptions {
            time_limit_ms_override: Some((scenario.seconds as u64) * 1_000),
            ..GameEngineOptions::default()
        },
    );

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    if let Err(error) = engine.start() {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            0,
            format!("session failed to start: {error}"),
        );
    }

    let mut watch = LifecycleWatch::new(scenario.ai_players, engine.config.time_limit_ms);
    let mut coins_spawned = 0u32;
    let mut caught = 0u32;
    let mut pauses = 0u32;
    let mut pause_ticks_left = 0u32;
    let mut paused_time_left = 0u64;
    let mut tick_safety = 0usize;
    let mut last_tick = 0u64;

    while engine.state() != SessionState::NotStarted && !engine.is_ended() {
        if pause_ticks_left > 0 {
            pause_ticks_left -= 1;
            if pause_ticks_left == 0 && engine.resume().is_err() {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    last_tick,
                    "resume rejected while paused".to_string(),
                );
            }
        } else if pauses == 0
            && scenario
                .pause_at_ms
                .is_some_and(|at| engine.elapsed_ms() >= at)
        {
            if engine.pause().is_ok() {
                pauses += 1;
                pause_ticks_left = 60;
                paused_time_left = engine.controller().timer().remaining_ms();
            }
        }

        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        let mut found = watch.check(&snapshot);
        if snapshot.state == SessionState::Paused && snapshot.time_left_ms != paused_time_left {
            found.push("timer advanced while paused".to_string());
        }
        for message in found {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::CoinSpawned { .. } => coins_spawned += 1,
                RuntimeEvent::ParticipantCaught { .. } => caught += 1,
                _ => {}
            }
        }

        tick_safety += 1;
        if tick_safety > 20 * 60 * 15 {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }
    }

    let summary = engine.build_summary();
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            ai_players: scenario.ai_players,
            seconds: scenario.seconds,
            level: scenario.level,
            reason: summary.reason,
            duration_ms: summary.duration_ms,
            total_collected: summary.total_collected,
            coins_spawned,
            caught,
            pauses,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    }
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));
    let level = cli
        .level
        .as_deref()
        .and_then(Level::parse)
        .unwrap_or(Level::Normal);

    if cli.single || cli.ai.is_some() || cli.seconds.is_some() {
        return vec![Scenario {
            name: format!("custom-ai{}", cli.ai.unwrap_or(2).clamp(1, 8)),
            ai_players: cli.ai.unwrap_or(2).clamp(1, 8) as usize,
            seconds: cli.seconds.unwrap_or(90).clamp(10, 600),
            level,
            seed,
            pause_at_ms: None,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-ai2".to_string(),
            ai_players: 2,
            seconds: 90,
            level: Level::Normal,
            seed,
            pause_at_ms: None,
        },
        Scenario {
            name: "pause-resume-ai2".to_string(),
            ai_players: 2,
            seconds: 90,
            level: Level::Easy,
            seed: normalize_seed(u64::from(seed) + 1),
            pause_at_ms: Some(5_000),
        },
        Scenario {
            name: "pressure-check-ai2".to_string(),
            ai_players: 2,
            seconds: 60,
            level: Level::Hard,
            seed: normalize_seed(u64::from(seed) + 2),
            pause_at_ms: None,
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_duration_ms = if scenario_count == 0 {
        0
    } else {
        total_duration_ms / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        reason_counts,
        scenarios,
    }
}

fn reason_key(reason: Option<GameOverReason>) -> &'static str {
    reason.map(GameOverReason::key).unwrap_or("none")
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
