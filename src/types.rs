use serde::Serialize;

use crate::rng::Rng;

pub type EntityId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpsState {
    Rock,
    Paper,
    Scissors,
}

impl RpsState {
    pub const ALL: [RpsState; 3] = [RpsState::Rock, RpsState::Paper, RpsState::Scissors];

    pub fn random(rng: &mut Rng) -> Self {
        Self::ALL[rng.pick_index(Self::ALL.len())]
    }

    /// The state this one defeats.
    pub fn beats(self) -> Self {
        match self {
            RpsState::Rock => RpsState::Scissors,
            RpsState::Scissors => RpsState::Paper,
            RpsState::Paper => RpsState::Rock,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: EntityId,
    pub nickname: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "rpsState")]
    pub rps_state: RpsState,
    #[serde(rename = "nextRpsState", skip_serializing_if = "Option::is_none")]
    pub next_rps_state: Option<RpsState>,
    pub size: f32,
    #[serde(rename = "isAgent")]
    pub is_agent: bool,
    #[serde(rename = "velocityX")]
    pub velocity_x: f32,
    #[serde(rename = "velocityY")]
    pub velocity_y: f32,
    #[serde(rename = "spawnTime")]
    pub spawn_time: u64,
    #[serde(rename = "lastTransformTime")]
    pub last_transform_time: u64,
    #[serde(rename = "killCount")]
    pub kill_count: u32,
    #[serde(rename = "isDashing")]
    pub is_dashing: bool,
}

/// Frozen per-tick copy of the room. Holds every entity's lookahead state;
/// use [`StateSnapshot::for_viewer`] before handing it to a client.
#[derive(Clone, Debug, Serialize)]
pub struct StateSnapshot {
    pub tick: u64,
    #[serde(rename = "serverTime")]
    pub server_time: u64,
    #[serde(rename = "timeUntilTransform")]
    pub time_until_transform: u64,
    pub players: Vec<PlayerView>,
}

impl StateSnapshot {
    pub fn for_viewer(&self, viewer_id: &str) -> StateSnapshot {
        let mut personal = self.clone();
        for player in &mut personal.players {
            if player.id != viewer_id {
                player.next_rps_state = None;
            }
        }
        personal
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EliminationNotice {
    #[serde(rename = "eliminatedId")]
    pub eliminated_id: EntityId,
    #[serde(rename = "eliminatedRpsState")]
    pub eliminated_rps_state: RpsState,
    #[serde(rename = "eliminatorId")]
    pub eliminator_id: EntityId,
    #[serde(rename = "eliminatorNickname")]
    pub eliminator_nickname: String,
    #[serde(rename = "eliminatorRpsState")]
    pub eliminator_rps_state: RpsState,
    pub message: String,
    #[serde(rename = "killCount")]
    pub kill_count: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct KillFeedItem {
    pub id: String,
    #[serde(rename = "winnerId")]
    pub winner_id: EntityId,
    #[serde(rename = "winnerNickname")]
    pub winner_nickname: String,
    #[serde(rename = "winnerRpsState")]
    pub winner_rps_state: RpsState,
    #[serde(rename = "loserId")]
    pub loser_id: EntityId,
    #[serde(rename = "loserNickname")]
    pub loser_nickname: String,
    #[serde(rename = "loserRpsState")]
    pub loser_rps_state: RpsState,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankingEntry {
    pub rank: usize,
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    pub nickname: String,
    #[serde(rename = "killCount")]
    pub kill_count: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct DashStateChange {
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    #[serde(rename = "isDashing")]
    pub is_dashing: bool,
    #[serde(rename = "cooldownEndTime")]
    pub cooldown_end_time: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct StateChange {
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    #[serde(rename = "rpsState")]
    pub rps_state: RpsState,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    State(StateSnapshot),
    /// Addressed to `eliminated_id` only.
    Eliminated(EliminationNotice),
    KillFeed(KillFeedItem),
    Ranking {
        entries: Vec<RankingEntry>,
    },
    DashChanged(DashStateChange),
    Transformed {
        changes: Vec<StateChange>,
        timestamp: u64,
    },
    TransformWarning {
        #[serde(rename = "timeUntilTransform")]
        time_until_transform: u64,
    },
    PlayerJoined {
        #[serde(rename = "playerId")]
        player_id: EntityId,
        nickname: String,
        #[serde(rename = "isAgent")]
        is_agent: bool,
    },
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: EntityId,
    },
}
