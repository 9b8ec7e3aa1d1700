pub mod clock;
pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod game;
pub mod rng;
pub mod server_protocol;
pub mod systems;
pub mod types;
pub mod validation;
