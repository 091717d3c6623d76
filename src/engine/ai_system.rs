use rand::Rng;

use super::utils::pick_index;
use super::GameEngine;
use crate::participants::ParticipantHandle;
use crate::types::{RuntimeEvent, SessionState};

const AI_THINK_MIN_MS: u64 = 150;
const AI_THINK_MAX_MS: u64 = 450;

impl GameEngine {
    /// AI-controlled participants grab a random coin whenever their think
    /// interval elapses.
    pub(super) fn update_ai_participants(&mut self) {
        for idx in 0..self.participants.len() {
            if self.controller.state() != SessionState::Playing {
                return;
            }
            let ready = {
                let participant = &self.participants[idx];
                participant.ai
                    && participant.handle.is_alive()
                    && participant.handle.is_active()
                    && self.elapsed_ms >= participant.ai_think_at
            };
            if !ready {
                continue;
            }
            self.participants[idx].ai_think_at =
                self.elapsed_ms + self.rng.random_range(AI_THINK_MIN_MS..=AI_THINK_MAX_MS);

            let available = self.controller.spawner().coins().len();
            let Some(pick) = pick_index(&mut self.rng, available) else {
                continue;
            };
            let Some(coin) = self.controller.spawner_mut().take_at(pick) else {
                continue;
            };
            let handle = self.participants[idx].handle.clone();
            self.apply_pickup(&handle, coin);
        }
    }

    pub(super) fn update_chaser(&mut self, dt_ms: u64) {
        if self.controller.state() != SessionState::Playing {
            return;
        }
        if !self.controller.difficulty_mut().update(dt_ms) {
            return;
        }
        let alive: Vec<usize> = self
            .participants
            .iter()
            .enumerate()
            .filter(|(_, participant)| participant.handle.is_alive())
            .map(|(idx, _)| idx)
            .collect();
        let Some(pick) = pick_index(&mut self.rng, alive.len()) else {
            return;
        };
        let handle = self.participants[alive[pick]].handle.clone();
        self.catch_participant(&handle);
    }

    fn catch_participant(&mut self, handle: &ParticipantHandle) {
        if !handle.eliminate() {
            return;
        }
        self.events.push(RuntimeEvent::ParticipantCaught {
            participant_id: handle.id().to_string(),
        });
        self.controller.on_participant_eliminated();
    }
}
