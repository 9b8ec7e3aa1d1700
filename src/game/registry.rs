use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::LobbyError;
use crate::validation::{normalize_invite_code, random_invite_code};

/// The slice of a room the registry needs. Implemented by [`super::room::Room`]
/// and by lightweight doubles in tests.
pub trait RoomLike: Send + Sync {
    fn id(&self) -> &str;
    fn code(&self) -> &str;
    fn is_public(&self) -> bool;
    fn created_at_ms(&self) -> u64;
    /// True when a human could not get in.
    fn is_full(&self) -> bool;
    /// True when no human is present.
    fn is_empty(&self) -> bool;
    /// False once the room has been taken out of service.
    fn is_available(&self) -> bool;
    fn player_count(&self) -> usize;
    fn real_player_count(&self) -> usize;
    fn stop_game_loop(&self);
}

/// Everything a new room is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomSeed {
    pub id: String,
    pub code: String,
    pub is_public: bool,
    pub created_at_ms: u64,
}

/// Process-wide room table, indexed by id and by invite code.
pub struct RoomRegistry<R: RoomLike> {
    rooms: DashMap<String, Arc<R>>,
    codes: DashMap<String, String>,
    clock: Arc<dyn Clock>,
    max_rooms: usize,
    empty_grace_ms: u64,
    create_lock: Mutex<()>,
}

impl<R: RoomLike> RoomRegistry<R> {
    pub fn new(clock: Arc<dyn Clock>, max_rooms: usize, empty_grace_ms: u64) -> Self {
        Self {
            rooms: DashMap::new(),
            codes: DashMap::new(),
            clock,
            max_rooms: max_rooms.max(1),
            empty_grace_ms,
            create_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Arc<R>> {
        self.rooms.get(id).map(|entry| entry.value().clone())
    }

    pub fn rooms(&self) -> Vec<Arc<R>> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn total_players(&self) -> usize {
        self.rooms
            .iter()
            .map(|entry| entry.value().real_player_count())
            .sum()
    }

    /// Case-insensitive invite code lookup.
    pub fn find_by_code(&self, raw_code: &str) -> Result<Arc<R>, LobbyError> {
        let code = normalize_invite_code(raw_code)?;
        let id = self
            .codes
            .get(&code)
            .map(|entry| entry.value().clone())
            .ok_or(LobbyError::RoomNotFound)?;
        self.get(&id).ok_or(LobbyError::RoomNotFound)
    }

    pub fn create_with<F>(&self, is_public: bool, build: F) -> Result<Arc<R>, LobbyError>
    where
        F: FnOnce(RoomSeed) -> R,
    {
        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.create_locked(is_public, build)
    }

    /// Oldest public room a human can still get into, or a fresh one.
    /// Private rooms are never matched.
    pub fn find_or_create_public_with<F>(&self, build: F) -> Result<Arc<R>, LobbyError>
    where
        F: FnOnce(RoomSeed) -> R,
    {
        let _guard = self.create_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let available = self
            .rooms
            .iter()
            .filter(|entry| {
                let room = entry.value();
                room.is_public() && room.is_available() && !room.is_full()
            })
            .min_by_key(|entry| entry.value().created_at_ms())
            .map(|entry| entry.value().clone());
        if let Some(room) = available {
            return Ok(room);
        }
        self.create_locked(true, build)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<R>> {
        let (_, room) = self.rooms.remove(id)?;
        self.codes.remove(room.code());
        room.stop_game_loop();
        info!(room_id = %id, code = %room.code(), "room removed");
        Some(room)
    }

    /// Drops out-of-service rooms, and rooms without humans once they are
    /// older than the grace period.
    pub fn sweep_empty(&self) -> usize {
        let now = self.clock.now_ms();
        let stale: Vec<String> = self
            .rooms
            .iter()
            .filter(|entry| {
                let room = entry.value();
                !room.is_available()
                    || (room.is_empty()
                        && now.saturating_sub(room.created_at_ms()) >= self.empty_grace_ms)
            })
            .map(|entry| entry.key().clone())
            .collect();
        let removed = stale.iter().filter(|id| self.remove(id).is_some()).count();
        if removed > 0 {
            info!(removed, remaining = self.rooms.len(), "swept empty rooms");
        }
        removed
    }

    fn create_locked<F>(&self, is_public: bool, build: F) -> Result<Arc<R>, LobbyError>
    where
        F: FnOnce(RoomSeed) -> R,
    {
        if self.rooms.len() >= self.max_rooms {
            self.sweep_empty();
            if self.rooms.len() >= self.max_rooms {
                return Err(LobbyError::TooManyRooms);
            }
        }

        let code = loop {
            let candidate = random_invite_code();
            if !self.codes.contains_key(&candidate) {
                break candidate;
            }
        };
        let seed = RoomSeed {
            id: Uuid::new_v4().to_string(),
            code,
            is_public,
            created_at_ms: self.clock.now_ms(),
        };
        let room = Arc::new(build(seed.clone()));
        self.codes.insert(seed.code.clone(), seed.id.clone());
        self.rooms.insert(seed.id.clone(), room.clone());
        info!(room_id = %seed.id, code = %seed.code, is_public, "room created");
        Ok(room)
    }
}
