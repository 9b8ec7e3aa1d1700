use super::*;
use crate::constants::DEATH_MESSAGES;
use crate::systems::collision::resolve_contacts;
use crate::types::{EliminationNotice, KillFeedItem};

impl RoomSimulation {
    pub(super) fn resolve_collisions(&mut self, now: u64) {
        let positions: Vec<(f32, f32)> = self.entities.iter().map(|e| (e.x, e.y)).collect();
        self.grid.rebuild(&positions);
        let pairs = self.grid.candidate_pairs(&positions);
        let report = resolve_contacts(&mut self.entities, &pairs, now, &self.config);
        if report.eliminations.is_empty() {
            return;
        }

        for elimination in &report.eliminations {
            let message = DEATH_MESSAGES[self.rng.pick_index(DEATH_MESSAGES.len())].to_string();
            self.kill_feed_counter += 1;
            let winner = &self.entities[elimination.winner];
            let loser = &self.entities[elimination.loser];
            trace!(winner = %winner.id, loser = %loser.id, "elimination");

            self.events.push(RoomEvent::Eliminated(EliminationNotice {
                eliminated_id: loser.id.clone(),
                eliminated_rps_state: elimination.loser_state,
                eliminator_id: winner.id.clone(),
                eliminator_nickname: winner.nickname.clone(),
                eliminator_rps_state: elimination.winner_state,
                message,
                kill_count: elimination.loser_kills,
            }));
            self.events.push(RoomEvent::KillFeed(KillFeedItem {
                id: format!("kill_{}", self.kill_feed_counter),
                winner_id: winner.id.clone(),
                winner_nickname: winner.nickname.clone(),
                winner_rps_state: elimination.winner_state,
                loser_id: loser.id.clone(),
                loser_nickname: loser.nickname.clone(),
                loser_rps_state: elimination.loser_state,
                timestamp: now,
            }));
        }

        let mut removed: Vec<usize> = report.removed().collect();
        removed.sort_unstable_by(|a, b| b.cmp(a));
        for index in removed {
            let entity = self.entities.remove(index);
            self.forget(&entity);
        }
    }
}
