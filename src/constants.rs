use crate::types::Level;

pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const COLLECTION_THRESHOLD: u32 = 50;
pub const DEFAULT_PARTICIPANT_COUNT: usize = 2;

pub const ARENA_WIDTH: i32 = 24;
pub const ARENA_HEIGHT: i32 = 16;

pub const COIN_SPAWN_INTERVAL_MS: u64 = 400;
pub const MAX_ACTIVE_COINS: usize = 12;

/// Pursuit progress (in cells) the chaser needs to catch one participant.
pub const CHASER_CATCH_DISTANCE: f32 = 40.0;

pub fn get_time_limit_ms(level: Level) -> u64 {
    match level {
        Level::Easy => 120_000,
        Level::Normal => 90_000,
        Level::Hard => 60_000,
    }
}

pub fn get_chaser_speed(level: Level) -> f32 {
    match level {
        Level::Easy => 2.0,
        Level::Normal => 3.0,
        Level::Hard => 4.5,
    }
}
