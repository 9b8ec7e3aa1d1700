use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, Span};

use super::registry::RoomLike;
use super::RoomSimulation;
use crate::config::SimulationConfig;
use crate::error::LobbyError;
use crate::types::{EntityId, RankingEntry, RoomEvent, StateSnapshot};
use crate::validation::validate_nickname;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, Serialize)]
pub struct RoomInfo {
    #[serde(rename = "roomId")]
    pub id: String,
    pub code: String,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
    #[serde(rename = "autoFill")]
    pub auto_fill: bool,
    #[serde(rename = "createdAt")]
    pub created_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomSummary {
    #[serde(flatten)]
    pub info: RoomInfo,
    pub players: usize,
    pub humans: usize,
    pub capacity: usize,
}

/// What a player gets back from a successful join.
#[derive(Clone, Debug, Serialize)]
pub struct JoinTicket {
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    pub config: SimulationConfig,
    pub snapshot: StateSnapshot,
}

/// A running room: the simulation behind an async lock, a tick task, and a
/// broadcast channel carrying everything the simulation emits.
pub struct Room {
    info: RoomInfo,
    capacity: usize,
    tick_period: Duration,
    sim: Mutex<RoomSimulation>,
    events: broadcast::Sender<RoomEvent>,
    humans: AtomicUsize,
    players: AtomicUsize,
    failed: AtomicBool,
    task: StdMutex<Option<JoinHandle<()>>>,
    span: Span,
}

impl Room {
    pub fn new(info: RoomInfo, sim: RoomSimulation) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let capacity = sim.config.capacity;
        let tick_period = Duration::from_micros(1_000_000 / u64::from(sim.config.tick_rate.max(1)));
        let span = info_span!("room", room_id = %info.id, code = %info.code);
        Self {
            info,
            capacity,
            tick_period,
            humans: AtomicUsize::new(sim.human_count()),
            players: AtomicUsize::new(sim.player_count()),
            sim: Mutex::new(sim),
            events,
            failed: AtomicBool::new(false),
            task: StdMutex::new(None),
            span,
        }
    }

    pub fn info(&self) -> &RoomInfo {
        &self.info
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            info: self.info.clone(),
            players: self.players.load(Ordering::Relaxed),
            humans: self.humans.load(Ordering::Relaxed),
            capacity: self.capacity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn is_looping(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// Spawns the tick task. A no-op while it is already running or after the
    /// room has failed. The task only holds a weak handle, so dropping the
    /// last `Arc<Room>` ends it.
    pub fn start(self: &Arc<Self>) {
        if self.has_failed() {
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let weak = Arc::downgrade(self);
        let period = self.tick_period;
        *task = Some(tokio::spawn(run_loop(weak, period)));
        info!(parent: &self.span, "room loop started");
    }

    /// Idempotent.
    pub fn stop(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!(parent: &self.span, "room loop stopped");
        }
        if let Ok(mut sim) = self.sim.try_lock() {
            sim.stop();
        }
    }

    pub async fn join(&self, nickname: &str) -> Result<JoinTicket, LobbyError> {
        let nickname = validate_nickname(nickname)?;
        if self.has_failed() {
            return Err(LobbyError::RoomUnavailable);
        }
        let mut sim = self.sim.lock().await;
        let Some(player_id) = sim.join(&nickname, false) else {
            info!(parent: &self.span, %nickname, "join rejected, room full");
            return Err(LobbyError::RoomFull);
        };
        self.publish_counts(&sim);
        info!(parent: &self.span, player_id = %player_id, %nickname, "player joined");
        Ok(JoinTicket {
            snapshot: sim.build_snapshot().for_viewer(&player_id),
            config: sim.config.clone(),
            player_id,
        })
    }

    pub async fn leave(&self, player_id: &str) -> bool {
        let mut sim = self.sim.lock().await;
        let removed = sim.leave(player_id);
        if removed {
            self.publish_counts(&sim);
            info!(parent: &self.span, player_id = %player_id, "player left");
        }
        removed
    }

    pub async fn set_movement_target(
        &self,
        player_id: &str,
        x: f32,
        y: f32,
        client_time: Option<f64>,
    ) {
        self.sim
            .lock()
            .await
            .set_movement_target(player_id, x, y, client_time);
    }

    pub async fn request_dash(&self, player_id: &str) -> bool {
        self.sim.lock().await.request_dash(player_id)
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.sim.lock().await.build_snapshot()
    }

    pub async fn ranking(&self) -> Vec<RankingEntry> {
        self.sim.lock().await.ranking()
    }

    /// One tick plus event fan-out. Returns false when the tick panicked and
    /// the room has been taken out of service.
    async fn tick_once(&self) -> bool {
        let mut sim = self.sim.lock().await;
        sim.start();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            sim.tick();
            sim.drain_events()
        }));
        match outcome {
            Ok(events) => {
                self.publish_counts(&sim);
                drop(sim);
                for event in events {
                    // No subscribers is fine.
                    let _ = self.events.send(event);
                }
                true
            }
            Err(payload) => {
                sim.stop();
                self.failed.store(true, Ordering::Relaxed);
                error!(
                    parent: &self.span,
                    reason = %panic_message(payload.as_ref()),
                    "room tick panicked, stopping room"
                );
                false
            }
        }
    }

    fn publish_counts(&self, sim: &RoomSimulation) {
        self.humans.store(sim.human_count(), Ordering::Relaxed);
        self.players.store(sim.player_count(), Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) async fn with_simulation<T>(&self, f: impl FnOnce(&mut RoomSimulation) -> T) -> T {
        let mut sim = self.sim.lock().await;
        let result = f(&mut sim);
        self.publish_counts(&sim);
        result
    }
}

async fn run_loop(room: Weak<Room>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let Some(room) = room.upgrade() else {
            break;
        };
        if !room.tick_once().await {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl RoomLike for Room {
    fn id(&self) -> &str {
        &self.info.id
    }

    fn code(&self) -> &str {
        &self.info.code
    }

    fn is_public(&self) -> bool {
        self.info.is_public
    }

    fn created_at_ms(&self) -> u64 {
        self.info.created_at_ms
    }

    fn is_full(&self) -> bool {
        self.humans.load(Ordering::Relaxed) >= self.capacity
    }

    fn is_empty(&self) -> bool {
        self.humans.load(Ordering::Relaxed) == 0
    }

    fn is_available(&self) -> bool {
        !self.has_failed()
    }

    fn player_count(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    fn real_player_count(&self) -> usize {
        self.humans.load(Ordering::Relaxed)
    }

    fn stop_game_loop(&self) {
        self.stop();
    }
}
