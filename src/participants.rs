use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::collaborators::ParticipantRegistry;
use crate::types::ParticipantView;

#[derive(Debug)]
struct ParticipantCell {
    id: String,
    name: String,
    collected: AtomicU32,
    alive: AtomicBool,
    active: AtomicBool,
}

/// Shared, non-owning view of a participant owned by the environment.
///
/// Cloning the handle does not clone the participant: every clone observes
/// the same counters.
#[derive(Clone, Debug)]
pub struct ParticipantHandle {
    cell: Arc<ParticipantCell>,
}

impl ParticipantHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cell: Arc::new(ParticipantCell {
                id: id.into(),
                name: name.into(),
                collected: AtomicU32::new(0),
                alive: AtomicBool::new(true),
                active: AtomicBool::new(true),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.cell.id
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn collected_count(&self) -> u32 {
        self.cell.collected.load(Ordering::Acquire)
    }

    /// Adds `amount` items and returns the new count. The count never
    /// decreases and saturates at `u32::MAX`.
    pub fn add_collected(&self, amount: u32) -> u32 {
        let mut current = self.cell.collected.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(amount);
            match self.cell.collected.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.cell.alive.load(Ordering::Acquire)
    }

    /// Marks the participant as caught. Returns `true` only for the call
    /// that performed the transition.
    pub fn eliminate(&self) -> bool {
        self.cell.alive.swap(false, Ordering::AcqRel)
    }

    pub fn is_active(&self) -> bool {
        self.cell.active.load(Ordering::Acquire)
    }

    pub fn deactivate(&self) {
        self.cell.active.store(false, Ordering::Release);
    }

    pub fn same_participant(&self, other: &ParticipantHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            id: self.id().to_string(),
            name: self.name().to_string(),
            collected: self.collected_count(),
            alive: self.is_alive(),
            active: self.is_active(),
        }
    }
}

/// The environment's list of participants, in join order.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    participants: Vec<ParticipantHandle>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, id: impl Into<String>, name: impl Into<String>) -> ParticipantHandle {
        let handle = ParticipantHandle::new(id, name);
        self.participants.push(handle.clone());
        handle
    }

    pub fn find(&self, id: &str) -> Option<&ParticipantHandle> {
        self.participants.iter().find(|participant| participant.id() == id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl ParticipantRegistry for Roster {
    fn snapshot_participants(&self) -> Vec<ParticipantHandle> {
        self.participants.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let handle = ParticipantHandle::new("p1", "Alice");
        let clone = handle.clone();
        assert_eq!(clone.add_collected(3), 3);
        assert_eq!(handle.collected_count(), 3);
        assert!(handle.same_participant(&clone));
    }

    #[test]
    fn collected_count_saturates() {
        let handle = ParticipantHandle::new("p1", "Alice");
        handle.add_collected(u32::MAX - 1);
        assert_eq!(handle.add_collected(5), u32::MAX);
    }

    #[test]
    fn eliminate_reports_only_first_transition() {
        let handle = ParticipantHandle::new("p1", "Alice");
        assert!(handle.eliminate());
        assert!(!handle.eliminate());
        assert!(!handle.is_alive());
    }

    #[test]
    fn roster_snapshot_keeps_join_order() {
        let mut roster = Roster::new();
        roster.join("p1", "Alice");
        roster.join("p2", "Bob");
        let ids: Vec<String> = roster
            .snapshot_participants()
            .iter()
            .map(|participant| participant.id().to_string())
            .collect();
        assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
        assert!(roster.find("p2").is_some());
        assert!(roster.find("p3").is_none());
    }
}
