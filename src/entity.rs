use crate::config::SimulationConfig;
use crate::types::{EntityId, PlayerView, RpsState};

/// Where and when a new entity enters the room.
#[derive(Clone, Copy, Debug)]
pub struct Spawn {
    pub position: (f32, f32),
    pub state: RpsState,
    pub now_ms: u64,
    /// The room's current transform clock, shared by every entity.
    pub last_transform_time: u64,
    pub joined_seq: u64,
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub nickname: String,
    pub is_agent: bool,

    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    /// Latest steering point; `None` means coast to a stop.
    pub target: Option<(f32, f32)>,

    pub state: RpsState,
    pub spawn_time: u64,
    pub last_transform_time: u64,
    pub kills: u32,

    /// Join order within the room, used for oldest-first eviction.
    pub joined_seq: u64,
    pub last_input_client_time: Option<f64>,
}

impl Entity {
    pub fn new(
        id: EntityId,
        nickname: String,
        is_agent: bool,
        spawn: Spawn,
        config: &SimulationConfig,
    ) -> Self {
        Self {
            id,
            nickname,
            is_agent,
            x: spawn.position.0,
            y: spawn.position.1,
            vx: 0.0,
            vy: 0.0,
            size: config.size_from_kills(0),
            target: None,
            state: spawn.state,
            spawn_time: spawn.now_ms,
            last_transform_time: spawn.last_transform_time,
            kills: 0,
            joined_seq: spawn.joined_seq,
            last_input_client_time: None,
        }
    }

    pub fn is_invincible(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms < self.spawn_time.saturating_add(window_ms)
    }

    pub fn record_kill(&mut self, config: &SimulationConfig) {
        self.kills = self.kills.saturating_add(1);
        self.size = config.size_from_kills(self.kills);
    }

    pub fn distance_to(&self, other: &Entity) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn view(&self, next_state: Option<RpsState>, is_dashing: bool) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            nickname: self.nickname.clone(),
            x: self.x,
            y: self.y,
            rps_state: self.state,
            next_rps_state: next_state,
            size: self.size,
            is_agent: self.is_agent,
            velocity_x: self.vx,
            velocity_y: self.vy,
            spawn_time: self.spawn_time,
            last_transform_time: self.last_transform_time,
            kill_count: self.kills,
            is_dashing,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_entity(id: &str, x: f32, y: f32, state: RpsState) -> Entity {
    Entity::new(
        id.to_string(),
        id.to_uppercase(),
        false,
        Spawn {
            position: (x, y),
            state,
            now_ms: 0,
            last_transform_time: 0,
            joined_seq: 0,
        },
        &SimulationConfig::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kills_grow_radius_and_never_shrink() {
        let config = SimulationConfig::default();
        let mut entity = test_entity("a", 100.0, 100.0, RpsState::Rock);
        assert_eq!(entity.size, config.base_size);
        let mut previous = entity.size;
        for _ in 0..50 {
            entity.record_kill(&config);
            assert!(entity.size >= previous);
            previous = entity.size;
        }
        assert_eq!(entity.kills, 50);
        assert_eq!(entity.size, config.max_size);
    }

    #[test]
    fn invincibility_window_is_relative_to_spawn() {
        let mut entity = test_entity("a", 0.0, 0.0, RpsState::Paper);
        entity.spawn_time = 10_000;
        assert!(entity.is_invincible(10_000, 3_000));
        assert!(entity.is_invincible(12_999, 3_000));
        assert!(!entity.is_invincible(13_000, 3_000));
    }
}
