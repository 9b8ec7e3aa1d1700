use crate::config::{SimulationConfig, SpeedConfig};
use crate::entity::Entity;

/// Top speed for a given radius. With no falloff configured this is the same
/// for every size.
pub fn max_speed(size: f32, speed: &SpeedConfig) -> f32 {
    match speed.size_falloff {
        None => speed.max_speed,
        Some(falloff) => {
            let slowed = speed.max_speed / (1.0 + falloff.max(0.0) * size.max(0.0) / 100.0);
            slowed.max(speed.min_speed).max(f32::MIN_POSITIVE)
        }
    }
}

/// Unit vector from `from` towards `to`, or exactly zero inside `epsilon`.
pub fn direction_to(from: (f32, f32), to: (f32, f32), epsilon: f32) -> (f32, f32) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let distance = (dx * dx + dy * dy).sqrt();
    if !distance.is_finite() || distance < epsilon {
        return (0.0, 0.0);
    }
    (dx / distance, dy / distance)
}

pub fn clamp_to_world(x: f32, y: f32, radius: f32, world_size: f32) -> (f32, f32) {
    let lo = radius.min(world_size / 2.0);
    let hi = (world_size - radius).max(lo);
    let fix = |value: f32| {
        if value.is_nan() {
            world_size / 2.0
        } else {
            value.clamp(lo, hi)
        }
    };
    (fix(x), fix(y))
}

#[derive(Clone, Debug)]
pub struct MovementEngine {
    world_size: f32,
    speed: SpeedConfig,
    arrival_epsilon: f32,
    idle_decay: f32,
    idle_snap: f32,
}

impl MovementEngine {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            world_size: config.world_size,
            speed: config.speed,
            arrival_epsilon: config.arrival_epsilon,
            idle_decay: config.idle_velocity_decay,
            idle_snap: config.idle_velocity_snap,
        }
    }

    /// Sets velocity from the entity's steering target, or decays it when the
    /// entity has no input.
    pub fn steer(&self, entity: &mut Entity, speed_multiplier: f32) {
        match entity.target {
            Some(target) => {
                let (dx, dy) = direction_to((entity.x, entity.y), target, self.arrival_epsilon);
                let speed = max_speed(entity.size, &self.speed) * speed_multiplier;
                entity.vx = dx * speed;
                entity.vy = dy * speed;
            }
            None => {
                entity.vx *= self.idle_decay;
                entity.vy *= self.idle_decay;
                if (entity.vx * entity.vx + entity.vy * entity.vy).sqrt() < self.idle_snap {
                    entity.vx = 0.0;
                    entity.vy = 0.0;
                }
            }
        }
    }

    pub fn integrate(&self, entity: &mut Entity, dt_secs: f32) {
        let (x, y) = clamp_to_world(
            entity.x + entity.vx * dt_secs,
            entity.y + entity.vy * dt_secs,
            entity.size,
            self.world_size,
        );
        entity.x = x;
        entity.y = y;
    }

    pub fn update(&self, entity: &mut Entity, speed_multiplier: f32, dt_secs: f32) {
        self.steer(entity, speed_multiplier);
        self.integrate(entity, dt_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_entity;
    use crate::types::RpsState;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn direction_points_at_target_with_unit_length() {
        let cases = [
            ((0.0, 0.0), (10.0, 0.0)),
            ((5.0, 5.0), (-30.0, 12.0)),
            ((100.0, 100.0), (101.5, 99.0)),
        ];
        for (from, to) in cases {
            let (dx, dy) = direction_to(from, to, 1.0);
            let dot = dx * (to.0 - from.0) + dy * (to.1 - from.1);
            assert!(dot > 0.0);
            assert!(approx_eq((dx * dx + dy * dy).sqrt(), 1.0, 1e-5));
        }
    }

    #[test]
    fn direction_is_zero_inside_epsilon() {
        assert_eq!(direction_to((10.0, 10.0), (10.5, 10.5), 1.0), (0.0, 0.0));
        assert_eq!(direction_to((10.0, 10.0), (10.0, 10.0), 1.0), (0.0, 0.0));
    }

    #[test]
    fn speed_is_positive_and_size_independent_by_default() {
        let speed = SpeedConfig::default();
        for size in [30.0, 45.5, 60.0, 90.0] {
            assert!(max_speed(size, &speed) > 0.0);
            assert_eq!(max_speed(size, &speed), max_speed(30.0, &speed));
        }
    }

    #[test]
    fn falloff_slows_bigger_entities_but_stays_positive() {
        let speed = SpeedConfig {
            size_falloff: Some(0.5),
            ..SpeedConfig::default()
        };
        assert!(max_speed(90.0, &speed) < max_speed(30.0, &speed));
        assert!(max_speed(10_000.0, &speed) >= speed.min_speed);
    }

    #[test]
    fn moves_toward_target_at_max_speed() {
        let config = SimulationConfig::default();
        let engine = MovementEngine::new(&config);
        let mut entity = test_entity("a", 500.0, 500.0, RpsState::Rock);
        entity.target = Some((1_500.0, 500.0));
        engine.update(&mut entity, 1.0, 0.1);
        assert!(approx_eq(entity.vx, config.speed.max_speed, 1e-3));
        assert!(approx_eq(entity.x, 538.0, 1e-3));
        assert_eq!(entity.y, 500.0);
    }

    #[test]
    fn dash_multiplier_scales_velocity() {
        let config = SimulationConfig::default();
        let engine = MovementEngine::new(&config);
        let mut entity = test_entity("a", 500.0, 500.0, RpsState::Rock);
        entity.target = Some((500.0, 1_500.0));
        engine.steer(&mut entity, 1.5);
        assert!(approx_eq(entity.vy, config.speed.max_speed * 1.5, 1e-3));
    }

    #[test]
    fn position_is_clamped_by_radius() {
        let config = SimulationConfig::default();
        let engine = MovementEngine::new(&config);
        let mut entity = test_entity("a", 40.0, 2_990.0, RpsState::Rock);
        entity.target = Some((-1_000.0, 10_000.0));
        for _ in 0..20 {
            engine.update(&mut entity, 1.0, 0.1);
        }
        assert_eq!(entity.x, entity.size);
        assert_eq!(entity.y, config.world_size - entity.size);
    }

    #[test]
    fn idle_entities_coast_to_a_stop() {
        let config = SimulationConfig::default();
        let engine = MovementEngine::new(&config);
        let mut entity = test_entity("a", 1_000.0, 1_000.0, RpsState::Rock);
        entity.vx = 100.0;
        engine.steer(&mut entity, 1.0);
        assert!(approx_eq(entity.vx, 90.0, 1e-4));
        for _ in 0..200 {
            engine.update(&mut entity, 1.0, 1.0 / 60.0);
        }
        assert_eq!(entity.vx, 0.0);
        assert!(entity.x > 1_000.0);
    }

    #[test]
    fn arriving_at_target_stops_without_jitter() {
        let config = SimulationConfig::default();
        let engine = MovementEngine::new(&config);
        let mut entity = test_entity("a", 1_000.0, 1_000.0, RpsState::Rock);
        entity.target = Some((1_000.4, 1_000.2));
        engine.update(&mut entity, 1.0, 0.1);
        assert_eq!((entity.vx, entity.vy), (0.0, 0.0));
        assert_eq!((entity.x, entity.y), (1_000.0, 1_000.0));
    }
}
