use serde::Serialize;

use crate::rng::Rng;
use crate::systems::movement::direction_to;
use crate::types::{EntityId, RpsState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotAction {
    Chase,
    Flee,
    Idle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BotDecision {
    pub action: BotAction,
    pub target_id: Option<EntityId>,
    /// Unit heading, or zero when the agent should hold still.
    pub direction: (f32, f32),
    pub target_distance: Option<f32>,
}

/// What an agent can see of another entity.
#[derive(Clone, Debug)]
pub struct Perceived {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub state: RpsState,
    pub invincible: bool,
}

/// The deciding agent itself.
#[derive(Clone, Copy, Debug)]
pub struct Viewpoint<'a> {
    pub id: &'a str,
    pub position: (f32, f32),
    pub state: RpsState,
}

/// Per-agent memory between decisions.
#[derive(Clone, Debug, Default)]
pub struct BotBrain {
    pub next_think_at: u64,
    pub wander_direction: Option<(f32, f32)>,
    pub wander_until: u64,
}

#[derive(Clone, Debug)]
pub struct AgentController {
    think_interval_ms: u64,
    detection_radius: f32,
    wander_hold_ms: u64,
}

impl AgentController {
    pub fn new(think_interval_ms: u64, detection_radius: f32, wander_hold_ms: u64) -> Self {
        Self {
            think_interval_ms,
            detection_radius,
            wander_hold_ms,
        }
    }

    /// Throttles decisions; advances the brain's next think time when due.
    pub fn should_think(&self, brain: &mut BotBrain, now_ms: u64) -> bool {
        if now_ms < brain.next_think_at {
            return false;
        }
        brain.next_think_at = now_ms + self.think_interval_ms;
        true
    }

    /// Chase the nearest beatable entity, else flee the nearest threat, else
    /// wander. Invincible entities are invisible; ties go to whichever comes
    /// first in `others`.
    pub fn decide(
        &self,
        me: Viewpoint<'_>,
        others: &[Perceived],
        brain: &mut BotBrain,
        now_ms: u64,
        rng: &mut Rng,
    ) -> BotDecision {
        let Viewpoint {
            id: self_id,
            position,
            state,
        } = me;
        let mut nearest_weak: Option<(&Perceived, f32)> = None;
        let mut nearest_strong: Option<(&Perceived, f32)> = None;

        for other in others {
            if other.id == self_id || other.invincible {
                continue;
            }
            let distance = ((other.x - position.0).powi(2) + (other.y - position.1).powi(2)).sqrt();
            if distance > self.detection_radius {
                continue;
            }
            let slot = if state.beats() == other.state {
                &mut nearest_weak
            } else if other.state.beats() == state {
                &mut nearest_strong
            } else {
                continue;
            };
            if slot.map_or(true, |(_, best)| distance < best) {
                *slot = Some((other, distance));
            }
        }

        if let Some((target, distance)) = nearest_weak {
            return BotDecision {
                action: BotAction::Chase,
                target_id: Some(target.id.clone()),
                direction: direction_to(position, (target.x, target.y), f32::EPSILON),
                target_distance: Some(distance),
            };
        }

        if let Some((threat, distance)) = nearest_strong {
            let (dx, dy) = direction_to(position, (threat.x, threat.y), f32::EPSILON);
            let direction = if (dx, dy) == (0.0, 0.0) {
                rng.unit_direction()
            } else {
                (-dx, -dy)
            };
            return BotDecision {
                action: BotAction::Flee,
                target_id: Some(threat.id.clone()),
                direction,
                target_distance: Some(distance),
            };
        }

        let direction = match brain.wander_direction {
            Some(held) if now_ms < brain.wander_until => held,
            _ => {
                let fresh = rng.unit_direction();
                brain.wander_direction = Some(fresh);
                brain.wander_until = now_ms + self.wander_hold_ms;
                fresh
            }
        };
        BotDecision {
            action: BotAction::Idle,
            target_id: None,
            direction,
            target_distance: None,
        }
    }
}
