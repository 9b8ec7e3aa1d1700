pub mod bot_ai;
pub mod collision;
pub mod dash;
pub mod movement;
pub mod population;
pub mod ranking;
pub mod spatial;
pub mod spawn;
pub mod transform;
