use crate::rng::Rng;

/// Maximin spawn placement: sample candidates and keep the one farthest
/// from its nearest occupant.
#[derive(Clone, Debug)]
pub struct SpawnPlacer {
    world_size: f32,
    margin: f32,
    candidates: usize,
}

impl SpawnPlacer {
    pub fn new(world_size: f32, margin: f32, candidates: usize) -> Self {
        Self {
            world_size,
            margin,
            candidates: candidates.max(1),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.world_size / 2.0, self.world_size / 2.0)
    }

    pub fn place(&self, occupied: &[(f32, f32)], rng: &mut Rng) -> (f32, f32) {
        if occupied.is_empty() {
            return self.center();
        }

        let lo = self.margin;
        let hi = self.world_size - self.margin;
        let mut best = self.center();
        let mut best_score = f32::NEG_INFINITY;

        for _ in 0..self.candidates {
            let x = rng.range_f32(lo, hi);
            let y = rng.range_f32(lo, hi);
            let score = occupied
                .iter()
                .map(|&(ox, oy)| ((x - ox).powi(2) + (y - oy).powi(2)).sqrt())
                .fold(f32::INFINITY, f32::min);
            if score > best_score {
                best_score = score;
                best = (x, y);
            }
        }
        best
    }
}
