use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::clock::Clock;
use crate::constants::BOT_NAMES;
use crate::types::EntityId;

pub fn target_agent_count(capacity: usize, humans: usize) -> usize {
    capacity.saturating_sub(humans)
}

/// The bits of an agent population decisions look at.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSlot {
    pub id: EntityId,
    pub joined_seq: u64,
    pub kills: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopulationPlan {
    pub add: usize,
    /// Agents to drop, oldest first.
    pub remove: Vec<EntityId>,
}

/// Brings the agent count towards `capacity - humans`. Additions are capped
/// at `max_additions` (one per tick in the steady loop); surplus agents are
/// removed oldest-first in one go.
pub fn plan_adjustment(
    capacity: usize,
    humans: usize,
    agents: &[AgentSlot],
    max_additions: usize,
) -> PopulationPlan {
    let target = target_agent_count(capacity, humans);
    if agents.len() < target {
        return PopulationPlan {
            add: (target - agents.len()).min(max_additions),
            remove: Vec::new(),
        };
    }

    let surplus = agents.len() - target;
    let mut oldest: Vec<&AgentSlot> = agents.iter().collect();
    oldest.sort_by_key(|slot| slot.joined_seq);
    PopulationPlan {
        add: 0,
        remove: oldest
            .into_iter()
            .take(surplus)
            .map(|slot| slot.id.clone())
            .collect(),
    }
}

/// Join-time eviction: fewest kills loses its spot, oldest on a tie.
pub fn pick_eviction_victim(agents: &[AgentSlot]) -> Option<&AgentSlot> {
    agents.iter().min_by_key(|slot| (slot.kills, slot.joined_seq))
}

#[derive(Debug, Default)]
struct NamePoolState {
    in_use: HashSet<String>,
    cooling: HashMap<String, u64>,
    fallback_seq: u64,
}

/// Display names for agents, shared by every room. A released name cools
/// down before it can be handed out again.
pub struct BotNamePool {
    clock: Arc<dyn Clock>,
    cooldown_ms: u64,
    names: Vec<String>,
    state: Mutex<NamePoolState>,
}

impl BotNamePool {
    pub fn new(clock: Arc<dyn Clock>, cooldown_ms: u64) -> Self {
        Self::with_names(clock, cooldown_ms, BOT_NAMES.iter().map(|name| name.to_string()))
    }

    pub fn with_names<I>(clock: Arc<dyn Clock>, cooldown_ms: u64, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            clock,
            cooldown_ms,
            names: names.into_iter().collect(),
            state: Mutex::new(NamePoolState::default()),
        }
    }

    pub fn acquire(&self) -> String {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.cooling.retain(|_, until| *until > now);

        if let Some(name) = self
            .names
            .iter()
            .find(|name| !state.in_use.contains(*name) && !state.cooling.contains_key(*name))
        {
            state.in_use.insert(name.clone());
            return name.clone();
        }

        loop {
            state.fallback_seq += 1;
            let name = format!("Bot{}", state.fallback_seq);
            if !state.in_use.contains(&name) && !state.cooling.contains_key(&name) {
                state.in_use.insert(name.clone());
                return name;
            }
        }
    }

    pub fn release(&self, name: &str) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_use.remove(name) {
            state.cooling.insert(name.to_string(), now + self.cooldown_ms);
        }
    }

    pub fn in_use(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_use
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn slot(id: &str, joined_seq: u64, kills: u32) -> AgentSlot {
        AgentSlot {
            id: id.to_string(),
            joined_seq,
            kills,
        }
    }

    fn apply(plan: &PopulationPlan, agents: &mut Vec<AgentSlot>, next_seq: &mut u64) {
        agents.retain(|agent| !plan.remove.contains(&agent.id));
        for _ in 0..plan.add {
            *next_seq += 1;
            agents.push(slot(&format!("bot{next_seq}"), *next_seq, 0));
        }
    }

    #[test]
    fn humans_plus_agents_always_equals_capacity() {
        let capacity = 20;
        let mut agents = Vec::new();
        let mut next_seq = 0;
        let sequence = [0, 1, 5, 5, 12, 20, 19, 3, 0, 20, 7];
        let mut previous: Option<(usize, usize)> = None;
        for humans in sequence {
            let plan = plan_adjustment(capacity, humans, &agents, usize::MAX);
            apply(&plan, &mut agents, &mut next_seq);
            assert_eq!(humans + agents.len(), capacity);
            if let Some((prev_humans, prev_agents)) = previous {
                if humans > prev_humans {
                    assert!(agents.len() <= prev_agents);
                }
            }
            previous = Some((humans, agents.len()));
        }
    }

    #[test]
    fn steady_top_up_adds_one_at_a_time() {
        let plan = plan_adjustment(20, 2, &[], 1);
        assert_eq!(plan.add, 1);
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn surplus_is_removed_oldest_first() {
        let agents = [slot("b", 5, 0), slot("a", 2, 9), slot("c", 7, 0)];
        let plan = plan_adjustment(3, 1, &agents, 1);
        assert_eq!(plan.remove, vec!["a".to_string()]);
    }

    #[test]
    fn join_eviction_prefers_lowest_kills_then_oldest() {
        let agents = [slot("strong", 1, 4), slot("young", 9, 0), slot("old", 3, 0)];
        assert_eq!(pick_eviction_victim(&agents).map(|s| s.id.as_str()), Some("old"));
        assert!(pick_eviction_victim(&[]).is_none());
    }

    #[test]
    fn released_names_cool_down() {
        let clock = Arc::new(ManualClock::new(0));
        let pool = BotNamePool::with_names(
            clock.clone(),
            60_000,
            ["Alpha", "Beta"].map(String::from),
        );
        assert_eq!(pool.acquire(), "Alpha");
        pool.release("Alpha");
        assert_eq!(pool.acquire(), "Beta");
        assert_eq!(pool.acquire(), "Bot1");
        clock.advance(60_000);
        assert_eq!(pool.acquire(), "Alpha");
        assert_eq!(pool.in_use(), 3);
    }

    #[test]
    fn releasing_unknown_name_is_harmless() {
        let pool = BotNamePool::new(Arc::new(ManualClock::new(0)), 60_000);
        pool.release("Nobody");
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.acquire(), BOT_NAMES[0]);
    }
}
