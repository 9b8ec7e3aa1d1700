pub const TICK_RATE: u32 = 60;
pub const TICK_INTERVAL_US: u64 = 1_000_000 / TICK_RATE as u64;
pub const MAX_FRAME_DELTA_MS: u64 = 100;
pub const BROADCAST_INTERVAL_MS: u64 = 50;
pub const RANKING_INTERVAL_MS: u64 = 1_000;
pub const RANKING_TOP_N: usize = 10;

pub const WORLD_SIZE: f32 = 3_000.0;
pub const ROOM_CAPACITY: usize = 20;

pub const BASE_SIZE: f32 = 30.0;
pub const MAX_SIZE: f32 = 90.0;
pub const SIZE_GROWTH_FACTOR: f32 = 10.0;

pub const MAX_SPEED: f32 = 380.0;
pub const ARRIVAL_EPSILON: f32 = 1.0;
pub const IDLE_VELOCITY_DECAY: f32 = 0.9;
pub const IDLE_VELOCITY_SNAP: f32 = 0.5;

pub const GRID_CELL_SIZE: f32 = 200.0;
pub const INVINCIBILITY_MS: u64 = 3_000;
pub const KNOCKBACK_DISTANCE: f32 = 50.0;

pub const TRANSFORM_INTERVAL_MS: u64 = 4_000;
pub const TRANSFORM_WARNING_MS: u64 = 500;

pub const DASH_DURATION_MS: u64 = 1_000;
pub const DASH_COOLDOWN_MS: u64 = 3_000;
pub const DASH_SPEED_MULTIPLIER: f32 = 1.5;

pub const BOT_THINK_INTERVAL_MS: u64 = 100;
pub const BOT_DETECTION_RADIUS: f32 = 500.0;
pub const BOT_WANDER_HOLD_MS: u64 = 2_000;
pub const BOT_STEER_DISTANCE: f32 = 200.0;
pub const BOT_DASH_DISTANCE: f32 = 180.0;

pub const SPAWN_CANDIDATES: usize = 30;
pub const SPAWN_MARGIN: f32 = 100.0;

pub const BOT_NAME_COOLDOWN_MS: u64 = 60_000;

pub const NICKNAME_MAX_LEN: usize = 12;
pub const INVITE_CODE_LEN: usize = 6;
pub const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const MAX_ROOMS: usize = 500;
pub const EMPTY_ROOM_GRACE_MS: u64 = 30_000;
pub const ROOM_SWEEP_INTERVAL_MS: u64 = 10_000;

pub const BOT_NAMES: &[&str] = &[
    "Pebble", "Boulder", "Origami", "Shears", "Granite", "Snippy", "Papyrus", "Flint",
    "Clippy", "Scroll", "Quartz", "Razor", "Napkin", "Cobble", "Trimmer", "Parchment",
    "Basalt", "Edge", "Confetti", "Marble", "Cutter", "Ledger", "Slate", "Snips",
    "Envelope", "Gravel", "Blade", "Kite", "Onyx", "Clipper", "Memo", "Obsidian",
];

pub const DEATH_MESSAGES: &[&str] = &[
    "Flattened like a pancake.",
    "That was not your best move.",
    "Outplayed by the laws of the game.",
    "Crumpled, cut, or crushed. Pick one.",
    "The cycle shows no mercy.",
    "Wrong shape, wrong time.",
    "Better luck next transform.",
    "You zigged when you should have zagged.",
];

/// Radius as a pure function of kill count.
pub fn size_from_kills(kills: u32) -> f32 {
    size_from_kills_with(kills, BASE_SIZE, MAX_SIZE, SIZE_GROWTH_FACTOR)
}

pub fn size_from_kills_with(kills: u32, base: f32, max: f32, growth: f32) -> f32 {
    (base + (kills as f32).sqrt() * growth).min(max)
}
