use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::entity::{Entity, Spawn};
use crate::rng::Rng;
use crate::systems::bot_ai::{AgentController, BotBrain};
use crate::systems::dash::DashController;
use crate::systems::movement::{clamp_to_world, MovementEngine};
use crate::systems::population::BotNamePool;
use crate::systems::ranking::compute_top;
use crate::systems::spatial::SpatialGrid;
use crate::systems::spawn::SpawnPlacer;
use crate::systems::transform::TransformTimer;
use crate::types::{EntityId, RankingEntry, RoomEvent, RpsState, StateSnapshot};

mod bot_system;
mod combat_system;
pub mod lobby;
pub mod registry;
pub mod room;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Created,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug)]
struct PendingMove {
    x: f32,
    y: f32,
    client_time: Option<f64>,
}

/// One room's authoritative state. Not thread-safe on its own; the room
/// runner owns it behind a lock and is the only thing that calls `tick`.
pub struct RoomSimulation {
    pub config: SimulationConfig,
    clock: Arc<dyn Clock>,
    rng: Rng,
    names: Arc<BotNamePool>,
    auto_fill: bool,

    entities: Vec<Entity>,
    pending_moves: HashMap<EntityId, PendingMove>,
    pending_dashes: Vec<EntityId>,
    brains: HashMap<EntityId, BotBrain>,

    movement: MovementEngine,
    grid: SpatialGrid,
    transform: TransformTimer,
    dash: DashController,
    spawner: SpawnPlacer,
    agents: AgentController,

    events: Vec<RoomEvent>,
    phase: Phase,
    tick_counter: u64,
    last_tick_at: u64,
    last_broadcast_at: u64,
    last_ranking_at: u64,
    next_id_counter: u64,
    kill_feed_counter: u64,
}

impl RoomSimulation {
    pub fn new(
        config: SimulationConfig,
        clock: Arc<dyn Clock>,
        names: Arc<BotNamePool>,
        seed: u32,
        auto_fill: bool,
    ) -> Self {
        let now = clock.now_ms();
        Self {
            movement: MovementEngine::new(&config),
            grid: SpatialGrid::new(config.world_size, config.grid_cell_size),
            transform: TransformTimer::new(
                config.transform_interval_ms,
                config.transform_warning_ms,
                now,
            ),
            dash: DashController::new(
                config.dash_duration_ms,
                config.dash_cooldown_ms,
                config.dash_speed_multiplier,
            ),
            spawner: SpawnPlacer::new(
                config.world_size,
                config.spawn_margin,
                config.spawn_candidates,
            ),
            agents: AgentController::new(
                config.bot_think_interval_ms,
                config.bot_detection_radius,
                config.bot_wander_hold_ms,
            ),
            config,
            clock,
            rng: Rng::new(seed),
            names,
            auto_fill,
            entities: Vec::new(),
            pending_moves: HashMap::new(),
            pending_dashes: Vec::new(),
            brains: HashMap::new(),
            events: Vec::new(),
            phase: Phase::Created,
            tick_counter: 0,
            last_tick_at: now,
            last_broadcast_at: now,
            last_ranking_at: now,
            next_id_counter: 1,
            kill_feed_counter: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn auto_fill(&self) -> bool {
        self.auto_fill
    }

    /// No-op while running. Resets the frame clock so the first delta after
    /// a (re)start is small.
    pub fn start(&mut self) {
        if self.phase == Phase::Running {
            return;
        }
        let now = self.clock.now_ms();
        self.last_tick_at = now;
        self.last_broadcast_at = now;
        self.last_ranking_at = now;
        self.phase = Phase::Running;
    }

    pub fn stop(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Stopped;
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entity(id).is_some()
    }

    /// Private lookahead; only ever shown to the entity itself.
    pub fn next_state(&self, id: &str) -> Option<RpsState> {
        self.transform.next_state(id)
    }

    pub fn human_count(&self) -> usize {
        self.entities.iter().filter(|entity| !entity.is_agent).count()
    }

    pub fn agent_count(&self) -> usize {
        self.entities.iter().filter(|entity| entity.is_agent).count()
    }

    pub fn player_count(&self) -> usize {
        self.entities.len()
    }

    /// Full means no human can get in: every slot is held by a human, so
    /// there is no agent left to evict.
    pub fn is_full(&self) -> bool {
        self.human_count() >= self.config.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.human_count() == 0
    }

    /// Adds an entity. Humans evict the weakest agent when the room is at
    /// capacity; `None` when there is nobody left to evict.
    pub fn join(&mut self, nickname: &str, is_agent: bool) -> Option<EntityId> {
        if is_agent {
            if self.player_count() >= self.config.capacity {
                return None;
            }
            return Some(self.spawn_entity(nickname.to_string(), true));
        }

        if self.is_full() {
            return None;
        }
        if self.player_count() >= self.config.capacity && !self.evict_weakest_agent() {
            return None;
        }

        let first_human = self.human_count() == 0;
        let id = self.spawn_entity(nickname.to_string(), false);
        if first_human && self.auto_fill {
            self.fill_to_capacity();
        }
        Some(id)
    }

    /// False for unknown ids.
    pub fn leave(&mut self, id: &str) -> bool {
        let Some(index) = self.entities.iter().position(|entity| entity.id == id) else {
            return false;
        };
        let entity = self.entities.remove(index);
        self.forget(&entity);
        self.events.push(RoomEvent::PlayerLeft {
            player_id: entity.id.clone(),
        });
        debug!(player_id = %entity.id, is_agent = entity.is_agent, "entity left");
        true
    }

    /// Queues a steering point for the next tick, replacing any queued one.
    /// Unknown ids, non-finite coordinates and inputs older than the last
    /// accepted one are dropped.
    pub fn set_movement_target(&mut self, id: &str, x: f32, y: f32, client_time: Option<f64>) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let Some(entity) = self.entity(id) else {
            return;
        };
        if let Some(sent) = client_time {
            let queued = self.pending_moves.get(id).and_then(|pending| pending.client_time);
            let latest = match (entity.last_input_client_time, queued) {
                (Some(applied), Some(queued)) => Some(applied.max(queued)),
                (applied, queued) => applied.or(queued),
            };
            if latest.is_some_and(|latest| sent < latest) {
                return;
            }
        }
        self.pending_moves.insert(
            id.to_string(),
            PendingMove {
                x,
                y,
                client_time,
            },
        );
    }

    /// Queues a dash attempt; the dash rules are applied on the next tick.
    pub fn request_dash(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        if !self.pending_dashes.iter().any(|queued| queued == id) {
            self.pending_dashes.push(id.to_string());
        }
        true
    }

    pub fn tick(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        let now = self.clock.now_ms();
        let dt_ms = now
            .saturating_sub(self.last_tick_at)
            .min(self.config.max_frame_delta_ms);
        self.last_tick_at = now;
        self.tick_counter += 1;

        self.apply_inputs();
        self.update_agents(now);
        self.update_dashes(now);
        self.update_movement(dt_ms as f32 / 1_000.0);
        self.update_transform(now);
        self.resolve_collisions(now);
        if self.auto_fill {
            self.adjust_agent_count(1);
        }
        self.emit_broadcasts(now);
    }

    pub fn drain_events(&mut self) -> Vec<RoomEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn build_snapshot(&self) -> StateSnapshot {
        let now = self.clock.now_ms();
        StateSnapshot {
            tick: self.tick_counter,
            server_time: now,
            time_until_transform: self.transform.time_until_next_transform(now),
            players: self
                .entities
                .iter()
                .map(|entity| {
                    entity.view(
                        self.transform.next_state(&entity.id),
                        self.dash.is_dashing(&entity.id),
                    )
                })
                .collect(),
        }
    }

    pub fn ranking(&self) -> Vec<RankingEntry> {
        compute_top(&self.entities, self.config.ranking_top_n)
    }

    fn make_id(&mut self, prefix: &str) -> (EntityId, u64) {
        let seq = self.next_id_counter;
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        (format!("{prefix}_{seq}"), seq)
    }

    fn spawn_entity(&mut self, nickname: String, is_agent: bool) -> EntityId {
        let now = self.clock.now_ms();
        let occupied: Vec<(f32, f32)> = self.entities.iter().map(|e| (e.x, e.y)).collect();
        let position = self.spawner.place(&occupied, &mut self.rng);
        let state = RpsState::random(&mut self.rng);
        let (id, seq) = self.make_id(if is_agent { "bot" } else { "player" });

        let entity = Entity::new(
            id.clone(),
            nickname,
            is_agent,
            Spawn {
                position,
                state,
                now_ms: now,
                last_transform_time: self.transform.last_transform_time(),
                joined_seq: seq,
            },
            &self.config,
        );
        self.transform.register(&id, &mut self.rng);
        if is_agent {
            self.brains.insert(id.clone(), BotBrain::default());
        }
        self.events.push(RoomEvent::PlayerJoined {
            player_id: id.clone(),
            nickname: entity.nickname.clone(),
            is_agent,
        });
        self.entities.push(entity);
        id
    }

    /// Drops every per-entity record held outside the entity list.
    fn forget(&mut self, entity: &Entity) {
        self.transform.unregister(&entity.id);
        self.dash.remove(&entity.id);
        self.brains.remove(&entity.id);
        self.pending_moves.remove(&entity.id);
        self.pending_dashes.retain(|queued| *queued != entity.id);
        if entity.is_agent {
            self.names.release(&entity.nickname);
        }
    }

    fn apply_inputs(&mut self) {
        let world = self.config.world_size;
        for (id, pending) in self.pending_moves.drain() {
            let Some(entity) = self.entities.iter_mut().find(|entity| entity.id == id) else {
                continue;
            };
            entity.target = Some(clamp_to_world(pending.x, pending.y, 0.0, world));
            if pending.client_time.is_some() {
                entity.last_input_client_time = pending.client_time;
            }
        }
    }

    fn update_dashes(&mut self, now: u64) {
        for id in std::mem::take(&mut self.pending_dashes) {
            if !self.contains(&id) {
                continue;
            }
            if let Some(change) = self.dash.start_dash(&id, now) {
                trace!(player_id = %id, "dash started");
                self.events.push(RoomEvent::DashChanged(change));
            }
        }
        for change in self.dash.update(now) {
            self.events.push(RoomEvent::DashChanged(change));
        }
    }

    fn update_movement(&mut self, dt_secs: f32) {
        for entity in &mut self.entities {
            let multiplier = self.dash.speed_multiplier(&entity.id);
            self.movement.update(entity, multiplier, dt_secs);
        }
    }

    fn update_transform(&mut self, now: u64) {
        let present: Vec<EntityId> = self.entities.iter().map(|e| e.id.clone()).collect();
        if let Some(changes) = self.transform.tick(now, &present, &mut self.rng) {
            for (entity, change) in self.entities.iter_mut().zip(&changes) {
                entity.state = change.rps_state;
                entity.last_transform_time = now;
            }
            trace!(count = changes.len(), "transform round");
            self.events.push(RoomEvent::Transformed {
                changes,
                timestamp: now,
            });
        }
        if self.transform.should_send_warning(now) {
            self.events.push(RoomEvent::TransformWarning {
                time_until_transform: self.transform.time_until_next_transform(now),
            });
        }
    }

    fn emit_broadcasts(&mut self, now: u64) {
        if now.saturating_sub(self.last_broadcast_at) >= self.config.broadcast_interval_ms {
            self.last_broadcast_at = now;
            let snapshot = self.build_snapshot();
            self.events.push(RoomEvent::State(snapshot));
        }
        if now.saturating_sub(self.last_ranking_at) >= self.config.ranking_interval_ms {
            self.last_ranking_at = now;
            let entries = self.ranking();
            self.events.push(RoomEvent::Ranking { entries });
        }
    }
}
