use std::collections::HashMap;

use crate::rng::Rng;
use crate::types::{EntityId, RpsState, StateChange};

/// Room-global transform countdown. Every registered entity carries a
/// pre-rolled next state which becomes its current state when the interval
/// elapses; all entities flip in the same tick.
#[derive(Debug)]
pub struct TransformTimer {
    interval_ms: u64,
    warning_ms: u64,
    last_global_transform: u64,
    next_states: HashMap<EntityId, RpsState>,
    warning_sent: bool,
}

impl TransformTimer {
    pub fn new(interval_ms: u64, warning_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            warning_ms,
            last_global_transform: now_ms,
            next_states: HashMap::new(),
            warning_sent: false,
        }
    }

    /// Rolls the entity's first lookahead state.
    pub fn register(&mut self, id: &str, rng: &mut Rng) -> RpsState {
        let next = RpsState::random(rng);
        self.next_states.insert(id.to_string(), next);
        next
    }

    pub fn unregister(&mut self, id: &str) {
        self.next_states.remove(id);
    }

    pub fn next_state(&self, id: &str) -> Option<RpsState> {
        self.next_states.get(id).copied()
    }

    pub fn last_transform_time(&self) -> u64 {
        self.last_global_transform
    }

    pub fn time_until_next_transform(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.last_global_transform);
        self.interval_ms.saturating_sub(elapsed)
    }

    /// True exactly once per round, once the countdown drops to the warning
    /// threshold.
    pub fn should_send_warning(&mut self, now_ms: u64) -> bool {
        if self.warning_sent || self.warning_ms == 0 {
            return false;
        }
        let remaining = self.time_until_next_transform(now_ms);
        if remaining > 0 && remaining <= self.warning_ms {
            self.warning_sent = true;
            return true;
        }
        false
    }

    /// Applies a round when due. `present` is the room's entity order; ids
    /// not in it are dropped from the lookahead map, and present ids that
    /// were never registered get one rolled now.
    pub fn tick(
        &mut self,
        now_ms: u64,
        present: &[EntityId],
        rng: &mut Rng,
    ) -> Option<Vec<StateChange>> {
        self.next_states
            .retain(|id, _| present.iter().any(|present_id| present_id == id));

        if now_ms.saturating_sub(self.last_global_transform) < self.interval_ms {
            return None;
        }

        let mut changes = Vec::with_capacity(present.len());
        for id in present {
            let current = match self.next_states.get(id) {
                Some(state) => *state,
                None => RpsState::random(rng),
            };
            self.next_states.insert(id.clone(), RpsState::random(rng));
            changes.push(StateChange {
                player_id: id.clone(),
                rps_state: current,
            });
        }

        self.last_global_transform = now_ms;
        self.warning_sent = false;
        Some(changes)
    }

    pub fn len(&self) -> usize {
        self.next_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_states.is_empty()
    }
}
