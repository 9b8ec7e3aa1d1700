use tracing::{debug, info};

use super::*;
use crate::systems::bot_ai::{BotAction, Perceived, Viewpoint};
use crate::systems::population::{pick_eviction_victim, plan_adjustment, AgentSlot};

impl RoomSimulation {
    /// Adds one agent with a pooled name; `None` at capacity.
    pub fn add_agent(&mut self) -> Option<EntityId> {
        if self.player_count() >= self.config.capacity {
            return None;
        }
        let name = self.names.acquire();
        Some(self.spawn_entity(name, true))
    }

    /// Tops the room up to `capacity - humans` agents in one go.
    pub fn fill_to_capacity(&mut self) -> usize {
        self.adjust_agent_count(usize::MAX)
    }

    /// Adds at most `max_additions` agents, or drops surplus agents
    /// oldest-first. Returns how many agents were added.
    pub fn adjust_agent_count(&mut self, max_additions: usize) -> usize {
        let plan = plan_adjustment(
            self.config.capacity,
            self.human_count(),
            &self.agent_slots(),
            max_additions,
        );
        for id in &plan.remove {
            if self.leave(id) {
                debug!(player_id = %id, "surplus agent removed");
            }
        }
        let mut added = 0;
        for _ in 0..plan.add {
            if self.add_agent().is_none() {
                break;
            }
            added += 1;
        }
        added
    }

    pub(super) fn agent_slots(&self) -> Vec<AgentSlot> {
        self.entities
            .iter()
            .filter(|entity| entity.is_agent)
            .map(|entity| AgentSlot {
                id: entity.id.clone(),
                joined_seq: entity.joined_seq,
                kills: entity.kills,
            })
            .collect()
    }

    /// Frees one slot for a joining human by dropping the agent with the
    /// fewest kills.
    pub(super) fn evict_weakest_agent(&mut self) -> bool {
        let slots = self.agent_slots();
        let Some(victim) = pick_eviction_victim(&slots) else {
            return false;
        };
        let victim = victim.id.clone();
        info!(player_id = %victim, "evicting agent for joining player");
        self.leave(&victim)
    }

    pub(super) fn update_agents(&mut self, now: u64) {
        if !self.entities.iter().any(|entity| entity.is_agent) {
            return;
        }
        let invincibility = self.config.invincibility_ms;
        let perceived: Vec<Perceived> = self
            .entities
            .iter()
            .map(|entity| Perceived {
                id: entity.id.clone(),
                x: entity.x,
                y: entity.y,
                state: entity.state,
                invincible: entity.is_invincible(now, invincibility),
            })
            .collect();

        for index in 0..self.entities.len() {
            if !self.entities[index].is_agent {
                continue;
            }
            let brain = self
                .brains
                .entry(self.entities[index].id.clone())
                .or_default();
            if !self.agents.should_think(brain, now) {
                continue;
            }

            let entity = &self.entities[index];
            let decision = self.agents.decide(
                Viewpoint {
                    id: &entity.id,
                    position: (entity.x, entity.y),
                    state: entity.state,
                },
                &perceived,
                brain,
                now,
                &mut self.rng,
            );

            let steer = self.config.bot_steer_distance;
            let world = self.config.world_size;
            let entity = &mut self.entities[index];
            let (dx, dy) = decision.direction;
            entity.target = if dx == 0.0 && dy == 0.0 {
                None
            } else {
                Some(clamp_to_world(
                    entity.x + dx * steer,
                    entity.y + dy * steer,
                    entity.size,
                    world,
                ))
            };

            let close = decision
                .target_distance
                .is_some_and(|distance| distance <= self.config.bot_dash_distance);
            if decision.action != BotAction::Idle && close {
                let id = entity.id.clone();
                if !self.pending_dashes.contains(&id) {
                    self.pending_dashes.push(id);
                }
            }
        }
    }
}
