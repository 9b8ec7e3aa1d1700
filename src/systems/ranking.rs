use crate::entity::Entity;
use crate::types::RankingEntry;

/// Top `limit` entities by kill count. Stable, so ties keep input order.
pub fn compute_top(entities: &[Entity], limit: usize) -> Vec<RankingEntry> {
    let mut ordered: Vec<&Entity> = entities.iter().collect();
    ordered.sort_by(|a, b| b.kills.cmp(&a.kills));
    ordered
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, entity)| RankingEntry {
            rank: index + 1,
            player_id: entity.id.clone(),
            nickname: entity.nickname.clone(),
            kill_count: entity.kills,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_entity;
    use crate::types::RpsState;

    fn with_kills(kills: &[u32]) -> Vec<Entity> {
        kills
            .iter()
            .enumerate()
            .map(|(index, &k)| {
                let mut entity = test_entity(&format!("p{index}"), 0.0, 0.0, RpsState::Rock);
                entity.kills = k;
                entity
            })
            .collect()
    }

    #[test]
    fn sorted_descending_with_sequential_ranks() {
        let entities = with_kills(&[3, 9, 0, 5, 9, 1, 7, 2, 2, 8, 4, 6]);
        let top = compute_top(&entities, 10);
        assert_eq!(top.len(), 10);
        for (index, entry) in top.iter().enumerate() {
            assert_eq!(entry.rank, index + 1);
        }
        assert!(top.windows(2).all(|pair| pair[0].kill_count >= pair[1].kill_count));

        let lowest = top.last().map(|entry| entry.kill_count).unwrap_or(0);
        for entity in &entities {
            if !top.iter().any(|entry| entry.player_id == entity.id) {
                assert!(entity.kills <= lowest);
            }
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let entities = with_kills(&[2, 5, 2, 5]);
        let ids: Vec<_> = compute_top(&entities, 4)
            .into_iter()
            .map(|entry| entry.player_id)
            .collect();
        assert_eq!(ids, vec!["p1", "p3", "p0", "p2"]);
    }

    #[test]
    fn short_input_yields_short_ranking() {
        assert_eq!(compute_top(&with_kills(&[1, 2]), 10).len(), 2);
        assert!(compute_top(&[], 10).is_empty());
    }
}
