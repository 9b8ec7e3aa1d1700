use std::collections::BTreeMap;

use crate::types::{DashStateChange, EntityId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DashState {
    pub is_dashing: bool,
    pub dash_end_time: u64,
    pub cooldown_end_time: u64,
}

/// idle -> dashing -> cooldown -> idle, per entity. Cooldown expires on its
/// own; only the dashing -> cooldown edge emits a change.
#[derive(Debug)]
pub struct DashController {
    duration_ms: u64,
    cooldown_ms: u64,
    multiplier: f32,
    states: BTreeMap<EntityId, DashState>,
}

impl DashController {
    pub fn new(duration_ms: u64, cooldown_ms: u64, multiplier: f32) -> Self {
        Self {
            duration_ms,
            cooldown_ms,
            multiplier,
            states: BTreeMap::new(),
        }
    }

    /// `None` without touching state while dashing or cooling down.
    pub fn start_dash(&mut self, id: &str, now_ms: u64) -> Option<DashStateChange> {
        let state = self.states.entry(id.to_string()).or_default();
        if state.is_dashing || now_ms < state.cooldown_end_time {
            return None;
        }
        state.is_dashing = true;
        state.dash_end_time = now_ms + self.duration_ms;
        Some(DashStateChange {
            player_id: id.to_string(),
            is_dashing: true,
            cooldown_end_time: state.cooldown_end_time,
            timestamp: now_ms,
        })
    }

    pub fn update(&mut self, now_ms: u64) -> Vec<DashStateChange> {
        let mut ended = Vec::new();
        for (id, state) in self.states.iter_mut() {
            if state.is_dashing && now_ms >= state.dash_end_time {
                state.is_dashing = false;
                state.cooldown_end_time = now_ms + self.cooldown_ms;
                ended.push(DashStateChange {
                    player_id: id.clone(),
                    is_dashing: false,
                    cooldown_end_time: state.cooldown_end_time,
                    timestamp: now_ms,
                });
            }
        }
        ended
    }

    pub fn speed_multiplier(&self, id: &str) -> f32 {
        if self.is_dashing(id) {
            self.multiplier
        } else {
            1.0
        }
    }

    pub fn is_dashing(&self, id: &str) -> bool {
        self.states.get(id).is_some_and(|state| state.is_dashing)
    }

    pub fn state(&self, id: &str) -> Option<DashState> {
        self.states.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) {
        self.states.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> DashController {
        DashController::new(1_000, 3_000, 1.5)
    }

    #[test]
    fn full_cycle_idle_dash_cooldown_idle() {
        let mut dash = controller();
        assert_eq!(dash.speed_multiplier("a"), 1.0);

        let started = dash.start_dash("a", 0).expect("idle entity can dash");
        assert!(started.is_dashing);
        assert_eq!(dash.speed_multiplier("a"), 1.5);

        assert!(dash.update(999).is_empty());
        let ended = dash.update(1_000);
        assert_eq!(ended.len(), 1);
        assert!(!ended[0].is_dashing);
        assert_eq!(ended[0].cooldown_end_time, 4_000);
        assert_eq!(dash.speed_multiplier("a"), 1.0);

        assert!(dash.start_dash("a", 3_999).is_none());
        assert!(dash.start_dash("a", 4_000).is_some());
    }

    #[test]
    fn cannot_restart_while_dashing() {
        let mut dash = controller();
        dash.start_dash("a", 0);
        let before = dash.state("a");
        assert!(dash.start_dash("a", 500).is_none());
        assert_eq!(dash.state("a"), before);
    }

    #[test]
    fn removal_clears_state() {
        let mut dash = controller();
        dash.start_dash("a", 0);
        dash.remove("a");
        assert!(!dash.is_dashing("a"));
        assert!(dash.state("a").is_none());
        assert!(dash.update(5_000).is_empty());
    }

    #[test]
    fn end_events_come_out_in_id_order() {
        let mut dash = controller();
        dash.start_dash("b", 0);
        dash.start_dash("a", 0);
        let ended: Vec<_> = dash.update(2_000).into_iter().map(|c| c.player_id).collect();
        assert_eq!(ended, vec!["a".to_string(), "b".to_string()]);
    }
}
