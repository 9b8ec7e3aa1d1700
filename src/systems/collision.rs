use std::collections::HashSet;

use crate::config::SimulationConfig;
use crate::entity::Entity;
use crate::systems::movement::clamp_to_world;
use crate::types::{Outcome, RpsState};

/// Outcome for `a` when it meets `b`.
pub fn resolve(a: RpsState, b: RpsState) -> Outcome {
    if a == b {
        Outcome::Draw
    } else if a.beats() == b {
        Outcome::Win
    } else {
        Outcome::Lose
    }
}

/// Strict overlap of the two circles.
pub fn is_colliding(a: &Entity, b: &Entity) -> bool {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let reach = a.size + b.size;
    dx * dx + dy * dy < reach * reach
}

/// Pushes `a` and `b` apart by `distance` each along the line between their
/// centres, then clamps both back inside the world.
pub fn apply_knockback(a: &mut Entity, b: &mut Entity, distance: f32, world_size: f32) {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let length = (dx * dx + dy * dy).sqrt();
    let (nx, ny) = if length > f32::EPSILON {
        (dx / length, dy / length)
    } else {
        (1.0, 0.0)
    };
    let (ax, ay) = clamp_to_world(a.x + nx * distance, a.y + ny * distance, a.size, world_size);
    let (bx, by) = clamp_to_world(b.x - nx * distance, b.y - ny * distance, b.size, world_size);
    a.x = ax;
    a.y = ay;
    b.x = bx;
    b.y = by;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Elimination {
    pub winner: usize,
    pub loser: usize,
    pub winner_state: RpsState,
    pub loser_state: RpsState,
    /// Loser's kill count at the moment it was eliminated.
    pub loser_kills: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ContactReport {
    pub eliminations: Vec<Elimination>,
    pub draws: usize,
}

impl ContactReport {
    pub fn removed(&self) -> impl Iterator<Item = usize> + '_ {
        self.eliminations.iter().map(|elimination| elimination.loser)
    }
}

fn pair_mut(entities: &mut [Entity], a: usize, b: usize) -> (&mut Entity, &mut Entity) {
    debug_assert!(a < b);
    let (head, tail) = entities.split_at_mut(b);
    (&mut head[a], &mut tail[0])
}

/// Walks the candidate pairs in order and applies eliminations and
/// knockback in place. Losers stay in the slice; the caller removes them
/// using [`ContactReport::removed`].
pub fn resolve_contacts(
    entities: &mut [Entity],
    pairs: &[(usize, usize)],
    now_ms: u64,
    config: &SimulationConfig,
) -> ContactReport {
    let mut report = ContactReport::default();
    let mut removed: HashSet<usize> = HashSet::new();

    for &(i, j) in pairs {
        if i == j || i >= entities.len() || j >= entities.len() {
            continue;
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        if removed.contains(&lo) || removed.contains(&hi) {
            continue;
        }
        let (a, b) = pair_mut(entities, lo, hi);
        if a.is_invincible(now_ms, config.invincibility_ms)
            || b.is_invincible(now_ms, config.invincibility_ms)
        {
            continue;
        }
        if !is_colliding(a, b) {
            continue;
        }

        match resolve(a.state, b.state) {
            Outcome::Draw => {
                apply_knockback(a, b, config.knockback_distance, config.world_size);
                report.draws += 1;
            }
            Outcome::Win => {
                let elimination = Elimination {
                    winner: lo,
                    loser: hi,
                    winner_state: a.state,
                    loser_state: b.state,
                    loser_kills: b.kills,
                };
                a.record_kill(config);
                removed.insert(hi);
                report.eliminations.push(elimination);
            }
            Outcome::Lose => {
                let elimination = Elimination {
                    winner: hi,
                    loser: lo,
                    winner_state: b.state,
                    loser_state: a.state,
                    loser_kills: a.kills,
                };
                b.record_kill(config);
                removed.insert(lo);
                report.eliminations.push(elimination);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_entity;
    use RpsState::{Paper, Rock, Scissors};

    fn vulnerable(id: &str, x: f32, y: f32, state: RpsState) -> Entity {
        let mut entity = test_entity(id, x, y, state);
        entity.spawn_time = 0;
        entity
    }

    const LATER: u64 = 60_000;

    #[test]
    fn resolve_matches_known_examples() {
        assert_eq!(resolve(Scissors, Paper), Outcome::Win);
        assert_eq!(resolve(Paper, Scissors), Outcome::Lose);
        assert_eq!(resolve(Rock, Rock), Outcome::Draw);
        assert_eq!(resolve(Rock, Scissors), Outcome::Win);
        assert_eq!(resolve(Paper, Rock), Outcome::Win);
    }

    #[test]
    fn resolve_is_total_antisymmetric_and_reflexive() {
        for a in RpsState::ALL {
            assert_eq!(resolve(a, a), Outcome::Draw);
            for b in RpsState::ALL {
                let forward = resolve(a, b);
                let backward = resolve(b, a);
                match forward {
                    Outcome::Win => assert_eq!(backward, Outcome::Lose),
                    Outcome::Lose => assert_eq!(backward, Outcome::Win),
                    Outcome::Draw => assert_eq!(backward, Outcome::Draw),
                }
            }
        }
    }

    #[test]
    fn touching_is_not_colliding() {
        let a = vulnerable("a", 100.0, 100.0, Rock);
        let b = vulnerable("b", 160.0, 100.0, Rock);
        assert!(!is_colliding(&a, &b));
        let c = vulnerable("c", 159.9, 100.0, Rock);
        assert!(is_colliding(&a, &c));
    }

    #[test]
    fn winner_gains_kill_and_loser_is_reported() {
        let config = SimulationConfig::default();
        let mut entities = vec![
            vulnerable("a", 500.0, 500.0, Paper),
            vulnerable("b", 520.0, 500.0, Rock),
        ];
        let report = resolve_contacts(&mut entities, &[(0, 1)], LATER, &config);
        assert_eq!(report.eliminations.len(), 1);
        let elimination = &report.eliminations[0];
        assert_eq!((elimination.winner, elimination.loser), (0, 1));
        assert_eq!(elimination.loser_state, Rock);
        assert_eq!(entities[0].kills, 1);
        assert!(entities[0].size > config.base_size);
    }

    #[test]
    fn draw_pushes_both_apart_symmetrically() {
        let config = SimulationConfig::default();
        let mut entities = vec![
            vulnerable("a", 1_000.0, 1_000.0, Scissors),
            vulnerable("b", 1_020.0, 1_000.0, Scissors),
        ];
        let report = resolve_contacts(&mut entities, &[(0, 1)], LATER, &config);
        assert_eq!(report.draws, 1);
        assert!(report.eliminations.is_empty());
        assert_eq!(entities[0].x, 950.0);
        assert_eq!(entities[1].x, 1_070.0);
        assert_eq!(entities[0].y, 1_000.0);
    }

    #[test]
    fn knockback_is_clamped_into_world() {
        let config = SimulationConfig::default();
        let mut entities = vec![
            vulnerable("a", 35.0, 500.0, Rock),
            vulnerable("b", 60.0, 500.0, Rock),
        ];
        resolve_contacts(&mut entities, &[(0, 1)], LATER, &config);
        assert_eq!(entities[0].x, entities[0].size);
        assert_eq!(entities[1].x, 110.0);
    }

    #[test]
    fn invincible_entities_are_skipped() {
        let config = SimulationConfig::default();
        let mut entities = vec![
            vulnerable("a", 500.0, 500.0, Paper),
            vulnerable("b", 520.0, 500.0, Rock),
        ];
        entities[1].spawn_time = LATER - 1_000;
        let report = resolve_contacts(&mut entities, &[(0, 1)], LATER, &config);
        assert!(report.eliminations.is_empty());
        assert_eq!(report.draws, 0);
        assert_eq!(entities[0].kills, 0);
    }

    #[test]
    fn removed_entity_is_not_processed_twice() {
        let config = SimulationConfig::default();
        let mut entities = vec![
            vulnerable("rock", 500.0, 500.0, Rock),
            vulnerable("paper", 510.0, 500.0, Paper),
            vulnerable("scissors", 505.0, 505.0, Scissors),
        ];
        let report = resolve_contacts(&mut entities, &[(0, 1), (0, 2), (1, 2)], LATER, &config);
        // paper eats rock first; rock is gone so (0, 2) is skipped; scissors cuts paper.
        assert_eq!(report.eliminations.len(), 2);
        assert_eq!(report.eliminations[0].loser, 0);
        assert_eq!(report.eliminations[1].loser, 1);
        assert_eq!(report.eliminations[1].winner, 2);
        assert_eq!(report.eliminations[1].loser_kills, 1);
        assert_eq!(entities[2].kills, 1);
    }
}
