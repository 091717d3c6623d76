use crate::collaborators::DifficultyController;
use crate::constants::{get_chaser_speed, CHASER_CATCH_DISTANCE};
use crate::types::Level;

/// The pursuing agent. It closes in on the participants at its level's
/// speed and catches one each time it covers the catch distance.
#[derive(Clone, Debug)]
pub struct ChaserAgent {
    level: Level,
    speed: f32,
    progress: f32,
}

impl ChaserAgent {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            speed: get_chaser_speed(level),
            progress: 0.0,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Cells per second.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Advances the pursuit. Returns `true` when a participant is caught.
    pub fn update(&mut self, dt_ms: u64) -> bool {
        self.progress += self.speed * dt_ms as f32 / 1000.0;
        if self.progress >= CHASER_CATCH_DISTANCE {
            self.progress -= CHASER_CATCH_DISTANCE;
            return true;
        }
        false
    }
}

impl DifficultyController for ChaserAgent {
    fn apply_level(&mut self, level: Level) {
        self.level = level;
        self.speed = get_chaser_speed(level);
    }
}
