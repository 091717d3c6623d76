use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Easy,
    Normal,
    Hard,
}

impl Level {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Self::Easy),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Playing,
    Paused,
    Won,
    Lost,
}

impl SessionState {
    /// `Won` and `Lost` absorb every later event.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Victory,
    TimeUp,
    AllCaught,
}

impl GameOverReason {
    pub fn terminal_state(self) -> SessionState {
        match self {
            Self::Victory => SessionState::Won,
            Self::TimeUp | Self::AllCaught => SessionState::Lost,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::TimeUp => "time_up",
            Self::AllCaught => "all_caught",
        }
    }
}

/// Lifecycle notifications consumed by presentation collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotification {
    SessionStarted {
        #[serde(rename = "participantCount")]
        participant_count: usize,
    },
    ItemCollected {
        total: u64,
    },
    Paused,
    Resumed,
    Victory,
    Defeat {
        reason: GameOverReason,
    },
    RestartRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CoinView {
    pub id: String,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "spawnedAtMs")]
    pub spawned_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParticipantView {
    pub id: String,
    pub name: String,
    pub collected: u32,
    pub alive: bool,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameConfig {
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    #[serde(rename = "collectionThreshold")]
    pub collection_threshold: u32,
    #[serde(rename = "timeLimitMs")]
    pub time_limit_ms: u64,
    #[serde(rename = "chaserSpeed")]
    pub chaser_speed: f32,
    pub level: Level,
}

#[derive(Clone, Debug, Serialize)]
pub struct TimelineEvent {
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    pub label: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    CoinSpawned {
        coin: CoinView,
    },
    CoinCollected {
        #[serde(rename = "coinId")]
        coin_id: String,
        by: String,
        total: u64,
    },
    ParticipantCaught {
        #[serde(rename = "participantId")]
        participant_id: String,
    },
    Lifecycle {
        notification: SessionNotification,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub state: SessionState,
    pub level: Level,
    #[serde(rename = "timeLeftMs")]
    pub time_left_ms: u64,
    #[serde(rename = "totalCollected")]
    pub total_collected: u64,
    #[serde(rename = "collectionThreshold")]
    pub collection_threshold: u32,
    #[serde(rename = "aliveCount")]
    pub alive_count: usize,
    pub participants: Vec<ParticipantView>,
    pub coins: Vec<CoinView>,
    pub events: Vec<RuntimeEvent>,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreEntry {
    #[serde(rename = "participantId")]
    pub participant_id: String,
    pub name: String,
    pub collected: u32,
    pub alive: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub reason: Option<GameOverReason>,
    pub state: SessionState,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(rename = "totalCollected")]
    pub total_collected: u64,
    #[serde(rename = "collectionThreshold")]
    pub collection_threshold: u32,
    #[serde(rename = "endedAt")]
    pub ended_at: String,
    pub timeline: Vec<TimelineEvent>,
    pub ranking: Vec<ScoreEntry>,
}

#[derive(Clone, Debug)]
pub struct StartPlayer {
    pub id: String,
    pub name: String,
    pub reconnect_token: String,
    pub connected: bool,
}
