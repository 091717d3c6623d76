use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::collaborators::SpawnController;
use crate::constants::{ARENA_HEIGHT, ARENA_WIDTH, COIN_SPAWN_INTERVAL_MS, MAX_ACTIVE_COINS};
use crate::types::{CoinView, Vec2};

#[derive(Clone, Debug)]
pub struct CoinSpawner {
    rng: StdRng,
    interval_ms: u64,
    max_active: usize,
    until_next_ms: u64,
    elapsed_ms: u64,
    active: bool,
    paused: bool,
    coins: Vec<CoinView>,
    next_id: u64,
}

impl CoinSpawner {
    pub fn new(seed: u64) -> Self {
        Self::with_rate(seed, COIN_SPAWN_INTERVAL_MS, MAX_ACTIVE_COINS)
    }

    pub fn with_rate(seed: u64, interval_ms: u64, max_active: usize) -> Self {
        let interval_ms = interval_ms.max(1);
        Self {
            rng: StdRng::seed_from_u64(seed),
            interval_ms,
            max_active,
            until_next_ms: interval_ms,
            elapsed_ms: 0,
            active: false,
            paused: false,
            coins: Vec::new(),
            next_id: 1,
        }
    }

    pub fn coins(&self) -> &[CoinView] {
        &self.coins
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Spawns the coins due in `dt_ms` and returns them.
    pub fn update(&mut self, dt_ms: u64) -> Vec<CoinView> {
        if !self.active || self.paused {
            return Vec::new();
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        let mut spawned = Vec::new();
        let mut budget = dt_ms;
        while budget >= self.until_next_ms {
            budget -= self.until_next_ms;
            self.until_next_ms = self.interval_ms;
            if self.coins.len() >= self.max_active {
                continue;
            }
            if let Some(coin) = self.spawn_coin() {
                spawned.push(coin);
            }
        }
        self.until_next_ms -= budget;
        spawned
    }

    pub fn take(&mut self, coin_id: &str) -> Option<CoinView> {
        let idx = self.coins.iter().position(|coin| coin.id == coin_id)?;
        Some(self.coins.swap_remove(idx))
    }

    pub fn take_at(&mut self, index: usize) -> Option<CoinView> {
        if index >= self.coins.len() {
            return None;
        }
        Some(self.coins.swap_remove(index))
    }

    fn spawn_coin(&mut self) -> Option<CoinView> {
        let position = self.pick_free_cell()?;
        let coin = CoinView {
            id: format!("coin_{}", self.next_id),
            x: position.x,
            y: position.y,
            spawned_at_ms: self.elapsed_ms,
        };
        self.next_id += 1;
        self.coins.push(coin.clone());
        Some(coin)
    }

    fn pick_free_cell(&mut self) -> Option<Vec2> {
        for _ in 0..24 {
            let x = self.rng.random_range(1..ARENA_WIDTH - 1);
            let y = self.rng.random_range(1..ARENA_HEIGHT - 1);
            if !self.coins.iter().any(|coin| coin.x == x && coin.y == y) {
                return Some(Vec2 { x, y });
            }
        }
        None
    }
}

impl SpawnController for CoinSpawner {
    fn start(&mut self) {
        self.active = true;
        self.paused = false;
        self.until_next_ms = self.interval_ms;
    }

    fn stop(&mut self) {
        self.active = false;
        self.paused = false;
        self.coins.clear();
    }

    fn pause(&mut self) {
        if self.active {
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawns_on_interval_once_started() {
        let mut spawner = CoinSpawner::with_rate(7, 100, 10);
        assert!(spawner.update(1_000).is_empty());

        spawner.start();
        assert!(spawner.update(50).is_empty());
        assert_eq!(spawner.update(50).len(), 1);
        assert_eq!(spawner.update(250).len(), 2);
        assert_eq!(spawner.coins().len(), 3);
    }

    #[test]
    fn respects_active_coin_cap() {
        let mut spawner = CoinSpawner::with_rate(11, 10, 3);
        spawner.start();
        spawner.update(1_000);
        assert_eq!(spawner.coins().len(), 3);
    }

    #[test]
    fn paused_spawner_holds_its_schedule() {
        let mut spawner = CoinSpawner::with_rate(3, 100, 10);
        spawner.start();
        spawner.update(60);
        spawner.pause();
        assert!(spawner.update(1_000).is_empty());
        spawner.resume();
        assert_eq!(spawner.update(40).len(), 1);
    }

    #[test]
    fn take_removes_coin_and_stop_clears_field() {
        let mut spawner = CoinSpawner::with_rate(5, 100, 10);
        spawner.start();
        let spawned = spawner.update(200);
        assert_eq!(spawned.len(), 2);

        let taken = spawner.take(&spawned[0].id).expect("coin should exist");
        assert_eq!(taken.id, spawned[0].id);
        assert!(spawner.take(&spawned[0].id).is_none());

        spawner.stop();
        assert!(spawner.coins().is_empty());
        assert!(spawner.update(1_000).is_empty());
    }

    #[test]
    fn coins_stay_inside_arena_walls() {
        let mut spawner = CoinSpawner::with_rate(99, 10, 12);
        spawner.start();
        for coin in spawner.update(120) {
            assert!(coin.x >= 1 && coin.x < ARENA_WIDTH - 1);
            assert!(coin.y >= 1 && coin.y < ARENA_HEIGHT - 1);
        }
    }
}
