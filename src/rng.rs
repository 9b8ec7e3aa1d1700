use std::f32::consts::TAU;

/// Seedable generator owned by a room; every random decision of the
/// simulation draws from it so a seed replays a whole match.
#[derive(Clone, Debug)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        let unit = self.next_u32() as f64 / 4_294_967_296.0;
        (unit as f32).min(1.0 - f32::EPSILON)
    }

    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + self.next_f32() * (max - min)
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        ((self.next_f32() * len as f32) as usize).min(len - 1)
    }

    /// Random unit vector.
    pub fn unit_direction(&mut self) -> (f32, f32) {
        let angle = self.next_f32() * TAU;
        (angle.cos(), angle.sin())
    }
}
