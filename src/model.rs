use serde::{Deserialize, Serialize};

use crate::schema::MatchStatus;

pub const DEFAULT_TEAM_SLOTS: u32 = 5;

fn default_slots() -> u32 {
    DEFAULT_TEAM_SLOTS
}

/// Player role within the shared pool: regular participant or coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRole {
    P,
    C,
}

/// A member of the shared player universe.
///
/// Stats are read-only here; they come from the deployment config and ride
/// along unchanged through pool and roster writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    #[serde(rename = "type")]
    pub role: PlayerRole,
    #[serde(default)]
    pub region: Option<String>,
    /// Lane preference tags, "1" through "5".
    #[serde(default)]
    pub subs: Vec<String>,
    #[serde(default)]
    pub mvps: u32,
    #[serde(default)]
    pub kd: f64,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub win_rate: String,
}

/// A participating team. `players` is insertion-ordered: the roster order
/// is the pick order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_slots")]
    pub slots: u32,
    #[serde(default)]
    pub players: Vec<Player>,
}

/// Directory entry: the listing header for one match. The deep data
/// (teams, pool, order, state, report) lives in per-id sub-records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub description: String,
}

/// One committed pick. Appended by the rotation engine, popped by undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRecord {
    pub order_index: usize,
    pub team_id: String,
    pub player_name: String,
}

/// Rotation bookkeeping for one match, stored as the `{id}:state`
/// sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationState {
    #[serde(default)]
    pub current_order_index: usize,
    #[serde(default)]
    pub active_team_id: Option<String>,
    /// Append-only log of committed picks; the undo target is the last
    /// entry, never a roster position.
    #[serde(default)]
    pub picks: Vec<PickRecord>,
}

/// Frozen snapshot of the final rosters. The only record that survives
/// finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub teams: Vec<Team>,
}
