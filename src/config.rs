use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use crate::constants::{
    size_from_kills_with, ARRIVAL_EPSILON, BASE_SIZE, BOT_DASH_DISTANCE, BOT_DETECTION_RADIUS,
    BOT_NAME_COOLDOWN_MS, BOT_STEER_DISTANCE, BOT_THINK_INTERVAL_MS, BOT_WANDER_HOLD_MS,
    BROADCAST_INTERVAL_MS, DASH_COOLDOWN_MS, DASH_DURATION_MS, DASH_SPEED_MULTIPLIER,
    EMPTY_ROOM_GRACE_MS, GRID_CELL_SIZE, IDLE_VELOCITY_DECAY, IDLE_VELOCITY_SNAP,
    INVINCIBILITY_MS, KNOCKBACK_DISTANCE, MAX_FRAME_DELTA_MS, MAX_ROOMS, MAX_SIZE, MAX_SPEED,
    RANKING_INTERVAL_MS, RANKING_TOP_N, ROOM_CAPACITY, ROOM_SWEEP_INTERVAL_MS,
    SIZE_GROWTH_FACTOR, SPAWN_CANDIDATES, SPAWN_MARGIN, TICK_RATE, TRANSFORM_INTERVAL_MS,
    TRANSFORM_WARNING_MS, WORLD_SIZE,
};
use crate::error::ConfigError;

/// Speed policy. `size_falloff` is kept for tuning; when unset every size
/// moves at `max_speed`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SpeedConfig {
    #[serde(rename = "maxSpeed")]
    pub max_speed: f32,
    #[serde(rename = "sizeFalloff")]
    pub size_falloff: Option<f32>,
    #[serde(rename = "minSpeed")]
    pub min_speed: f32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            size_falloff: None,
            min_speed: MAX_SPEED * 0.5,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SimulationConfig {
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    #[serde(rename = "maxFrameDeltaMs")]
    pub max_frame_delta_ms: u64,
    #[serde(rename = "broadcastIntervalMs")]
    pub broadcast_interval_ms: u64,
    #[serde(rename = "rankingIntervalMs")]
    pub ranking_interval_ms: u64,
    #[serde(rename = "rankingTopN")]
    pub ranking_top_n: usize,

    #[serde(rename = "worldSize")]
    pub world_size: f32,
    pub capacity: usize,

    #[serde(rename = "baseSize")]
    pub base_size: f32,
    #[serde(rename = "maxSize")]
    pub max_size: f32,
    #[serde(rename = "sizeGrowthFactor")]
    pub size_growth_factor: f32,

    pub speed: SpeedConfig,
    #[serde(rename = "arrivalEpsilon")]
    pub arrival_epsilon: f32,
    #[serde(rename = "idleVelocityDecay")]
    pub idle_velocity_decay: f32,
    #[serde(rename = "idleVelocitySnap")]
    pub idle_velocity_snap: f32,

    #[serde(rename = "gridCellSize")]
    pub grid_cell_size: f32,
    #[serde(rename = "invincibilityMs")]
    pub invincibility_ms: u64,
    #[serde(rename = "knockbackDistance")]
    pub knockback_distance: f32,

    #[serde(rename = "transformIntervalMs")]
    pub transform_interval_ms: u64,
    #[serde(rename = "transformWarningMs")]
    pub transform_warning_ms: u64,

    #[serde(rename = "dashDurationMs")]
    pub dash_duration_ms: u64,
    #[serde(rename = "dashCooldownMs")]
    pub dash_cooldown_ms: u64,
    #[serde(rename = "dashSpeedMultiplier")]
    pub dash_speed_multiplier: f32,

    #[serde(rename = "botThinkIntervalMs")]
    pub bot_think_interval_ms: u64,
    #[serde(rename = "botDetectionRadius")]
    pub bot_detection_radius: f32,
    #[serde(rename = "botWanderHoldMs")]
    pub bot_wander_hold_ms: u64,
    #[serde(rename = "botSteerDistance")]
    pub bot_steer_distance: f32,
    #[serde(rename = "botDashDistance")]
    pub bot_dash_distance: f32,

    #[serde(rename = "spawnCandidates")]
    pub spawn_candidates: usize,
    #[serde(rename = "spawnMargin")]
    pub spawn_margin: f32,

    #[serde(rename = "botNameCooldownMs")]
    pub bot_name_cooldown_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_frame_delta_ms: MAX_FRAME_DELTA_MS,
            broadcast_interval_ms: BROADCAST_INTERVAL_MS,
            ranking_interval_ms: RANKING_INTERVAL_MS,
            ranking_top_n: RANKING_TOP_N,
            world_size: WORLD_SIZE,
            capacity: ROOM_CAPACITY,
            base_size: BASE_SIZE,
            max_size: MAX_SIZE,
            size_growth_factor: SIZE_GROWTH_FACTOR,
            speed: SpeedConfig::default(),
            arrival_epsilon: ARRIVAL_EPSILON,
            idle_velocity_decay: IDLE_VELOCITY_DECAY,
            idle_velocity_snap: IDLE_VELOCITY_SNAP,
            grid_cell_size: GRID_CELL_SIZE,
            invincibility_ms: INVINCIBILITY_MS,
            knockback_distance: KNOCKBACK_DISTANCE,
            transform_interval_ms: TRANSFORM_INTERVAL_MS,
            transform_warning_ms: TRANSFORM_WARNING_MS,
            dash_duration_ms: DASH_DURATION_MS,
            dash_cooldown_ms: DASH_COOLDOWN_MS,
            dash_speed_multiplier: DASH_SPEED_MULTIPLIER,
            bot_think_interval_ms: BOT_THINK_INTERVAL_MS,
            bot_detection_radius: BOT_DETECTION_RADIUS,
            bot_wander_hold_ms: BOT_WANDER_HOLD_MS,
            bot_steer_distance: BOT_STEER_DISTANCE,
            bot_dash_distance: BOT_DASH_DISTANCE,
            spawn_candidates: SPAWN_CANDIDATES,
            spawn_margin: SPAWN_MARGIN,
            bot_name_cooldown_ms: BOT_NAME_COOLDOWN_MS,
        }
    }
}

impl SimulationConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn size_from_kills(&self, kills: u32) -> f32 {
        size_from_kills_with(kills, self.base_size, self.max_size, self.size_growth_factor)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("worldSize", self.world_size),
            ("baseSize", self.base_size),
            ("maxSpeed", self.speed.max_speed),
            ("gridCellSize", self.grid_cell_size),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field });
            }
        }
        if self.capacity == 0 {
            return Err(ConfigError::NotPositive { field: "capacity" });
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::NotPositive { field: "tickRate" });
        }
        if self.transform_interval_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "transformIntervalMs",
            });
        }
        if self.max_size < self.base_size {
            return Err(ConfigError::SizeRange {
                base_size: self.base_size,
                max_size: self.max_size,
            });
        }
        if self.grid_cell_size < self.max_size * 2.0 {
            return Err(ConfigError::CellTooSmall {
                cell: self.grid_cell_size,
                max_size: self.max_size,
            });
        }
        if self.spawn_margin * 2.0 >= self.world_size {
            return Err(ConfigError::MarginTooLarge {
                margin: self.spawn_margin,
                world: self.world_size,
            });
        }
        Ok(())
    }
}

/// Process-level settings for the transport binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ServerConfig {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(long, env = "ROOM_CAPACITY", default_value_t = ROOM_CAPACITY)]
    pub capacity: usize,
    #[arg(long, env = "MAX_ROOMS", default_value_t = MAX_ROOMS)]
    pub max_rooms: usize,
    #[arg(long, env = "ROOM_SWEEP_INTERVAL_MS", default_value_t = ROOM_SWEEP_INTERVAL_MS)]
    pub sweep_interval_ms: u64,
    #[arg(long, env = "EMPTY_ROOM_GRACE_MS", default_value_t = EMPTY_ROOM_GRACE_MS)]
    pub empty_room_grace_ms: u64,
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig::with_capacity(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_cell_smaller_than_two_radii() {
        let config = SimulationConfig {
            grid_cell_size: 100.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CellTooSmall { .. })
        ));
    }

    #[test]
    fn rejects_zero_capacity() {
        assert_eq!(
            SimulationConfig::with_capacity(0).validate(),
            Err(ConfigError::NotPositive { field: "capacity" })
        );
    }

    #[test]
    fn server_config_parses_flags() {
        let config = ServerConfig::try_parse_from(["server", "--port", "9000", "--capacity", "8"])
            .expect("flags should parse");
        assert_eq!(config.port, 9000);
        assert_eq!(config.simulation().capacity, 8);
    }
}
