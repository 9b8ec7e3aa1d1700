use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::registry::{RoomRegistry, RoomSeed};
use super::room::{JoinTicket, Room, RoomInfo};
use super::RoomSimulation;
use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::error::LobbyError;
use crate::systems::population::BotNamePool;
use crate::validation::validate_nickname;

/// Room management front door: owns the registry and the bot name pool
/// shared by every room, and builds rooms on demand.
pub struct Lobby {
    config: SimulationConfig,
    clock: Arc<dyn Clock>,
    names: Arc<BotNamePool>,
    registry: RoomRegistry<Room>,
}

impl Lobby {
    pub fn new(
        config: SimulationConfig,
        clock: Arc<dyn Clock>,
        max_rooms: usize,
        empty_grace_ms: u64,
    ) -> Self {
        let names = Arc::new(BotNamePool::new(clock.clone(), config.bot_name_cooldown_ms));
        Self {
            registry: RoomRegistry::new(clock.clone(), max_rooms, empty_grace_ms),
            config,
            clock,
            names,
        }
    }

    pub fn registry(&self) -> &RoomRegistry<Room> {
        &self.registry
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn build_room(&self, seed: RoomSeed, auto_fill: bool) -> Room {
        let sim = RoomSimulation::new(
            self.config.clone(),
            self.clock.clone(),
            self.names.clone(),
            rand::random::<u32>(),
            auto_fill,
        );
        Room::new(
            RoomInfo {
                id: seed.id,
                code: seed.code,
                is_public: seed.is_public,
                auto_fill,
                created_at_ms: seed.created_at_ms,
            },
            sim,
        )
    }

    /// Creates and starts a room. Must be called inside a tokio runtime.
    pub fn create_room(&self, is_public: bool, auto_fill: bool) -> Result<Arc<Room>, LobbyError> {
        let room = self
            .registry
            .create_with(is_public, |seed| self.build_room(seed, auto_fill))?;
        room.start();
        Ok(room)
    }

    /// Public rooms always top themselves up with agents.
    pub fn find_or_create_public(&self) -> Result<Arc<Room>, LobbyError> {
        let room = self
            .registry
            .find_or_create_public_with(|seed| self.build_room(seed, true))?;
        room.start();
        Ok(room)
    }

    pub fn find_by_code(&self, code: &str) -> Result<Arc<Room>, LobbyError> {
        self.registry.find_by_code(code)
    }

    /// Validates both inputs before touching any room.
    pub async fn join_by_code(
        &self,
        code: &str,
        nickname: &str,
    ) -> Result<(Arc<Room>, JoinTicket), LobbyError> {
        validate_nickname(nickname)?;
        let room = self.find_by_code(code)?;
        let ticket = room.join(nickname).await?;
        Ok((room, ticket))
    }

    pub fn sweep(&self) -> usize {
        self.registry.sweep_empty()
    }

    /// Periodic empty-room sweep. Holds only a weak handle.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let lobby = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(lobby) = lobby.upgrade() else {
                    break;
                };
                let removed = lobby.sweep();
                debug!(removed, rooms = lobby.registry.len(), "room sweep");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::game::registry::RoomLike;

    fn lobby(max_rooms: usize) -> (Arc<Lobby>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let lobby = Lobby::new(SimulationConfig::with_capacity(4), clock.clone(), max_rooms, 1_000);
        (Arc::new(lobby), clock)
    }

    #[tokio::test]
    async fn public_match_fills_with_agents() {
        let (lobby, _clock) = lobby(10);
        let room = lobby.find_or_create_public().unwrap();
        let ticket = room.join("Alice").await.unwrap();
        assert_eq!(ticket.snapshot.players.len(), 4);
        assert_eq!(room.real_player_count(), 1);
        assert!(room.is_looping());

        let again = lobby.find_or_create_public().unwrap();
        assert_eq!(again.id(), room.id());
        room.stop();
    }

    #[tokio::test]
    async fn join_by_code_reports_structured_errors() {
        let (lobby, _clock) = lobby(10);
        let room = lobby.create_room(false, false).unwrap();
        let code = room.code().to_ascii_lowercase();

        let (joined, ticket) = lobby.join_by_code(&code, "Bob").await.unwrap();
        assert_eq!(joined.id(), room.id());
        assert_eq!(ticket.snapshot.players.len(), 1);

        assert_eq!(
            lobby.join_by_code(&code, "no way").await.err(),
            Some(LobbyError::InvalidNickname)
        );
        assert_eq!(
            lobby.join_by_code("Q", "Bob").await.err(),
            Some(LobbyError::InvalidRoomCode)
        );
        assert_eq!(
            lobby.join_by_code("ZZZZZZ", "Bob").await.err(),
            Some(LobbyError::RoomNotFound)
        );
        room.stop();
    }

    #[tokio::test]
    async fn sweep_drops_abandoned_rooms() {
        let (lobby, clock) = lobby(10);
        let room = lobby.create_room(true, true).unwrap();
        let ticket = room.join("Alice").await.unwrap();
        clock.advance(1_000);
        assert_eq!(lobby.sweep(), 0);

        room.leave(&ticket.player_id).await;
        assert_eq!(lobby.sweep(), 1);
        assert!(!room.is_looping());
        assert!(lobby.registry().is_empty());
    }

    #[tokio::test]
    async fn failed_room_is_not_matched_and_gets_swept() {
        let (lobby, _clock) = lobby(10);
        let room = lobby.find_or_create_public().unwrap();
        room.join("Alice").await.unwrap();
        room.with_simulation(|sim| {
            sim.grid.cols = 0;
            sim.grid.rows = 0;
        })
        .await;
        for _ in 0..50 {
            if room.has_failed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(room.has_failed());

        let other = lobby.find_or_create_public().unwrap();
        assert_ne!(other.id(), room.id());
        assert_eq!(
            lobby.join_by_code(room.code(), "Bob").await.err(),
            Some(LobbyError::RoomUnavailable)
        );

        assert_eq!(lobby.sweep(), 1);
        assert!(lobby.registry().get(room.id()).is_none());
        assert!(lobby.registry().get(other.id()).is_some());
        other.stop();
    }

    #[tokio::test]
    async fn full_lobby_refuses_new_rooms() {
        let (lobby, _clock) = lobby(1);
        let room = lobby.create_room(false, false).unwrap();
        room.join("Alice").await.unwrap();
        assert_eq!(
            lobby.create_room(false, false).err().map(|e| e.to_string()),
            Some("too many rooms, try again later".to_string())
        );
        room.stop();
    }
}
