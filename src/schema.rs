use anyhow::{anyhow, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Player, Team};

/// Match lifecycle: preparing -> drafting -> live -> ended.
///
/// `live` is entered by report generation; `ended` only by a direct
/// directory edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Preparing,
    Drafting,
    Live,
    Ended,
}

impl MatchStatus {
    /// Draft sub-records stay admin-only while a match is still being
    /// prepared; from drafting onward everyone may read them.
    pub fn draft_visible_to_viewers(self) -> bool {
        !matches!(self, MatchStatus::Preparing)
    }
}

impl TryFrom<&str> for MatchStatus {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "preparing" => Ok(MatchStatus::Preparing),
            "drafting" => Ok(MatchStatus::Drafting),
            "live" => Ok(MatchStatus::Live),
            "ended" => Ok(MatchStatus::Ended),
            _ => Err(anyhow!("Invalid status: {}", s)),
        }
    }
}

// For String
impl TryFrom<String> for MatchStatus {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        MatchStatus::try_from(s.as_str())
    }
}

fn default_status() -> MatchStatus {
    MatchStatus::Preparing
}

/// Body of `POST /api/matches`. The server assigns the id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchSchema {
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default = "default_status")]
    pub status: MatchStatus,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginSchema {
    pub account: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUpdateSchema {
    pub id: String,
    pub pool: Vec<Player>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderUpdateSchema {
    pub id: String,
    pub draft_order: Vec<String>,
}

/// Body of `POST /api/match/state`: an id plus whatever rotation fields
/// the caller wants persisted. The state sub-record is overwritten
/// wholesale, exactly like the other structured parts.
#[derive(Debug, Deserialize)]
pub struct StateUpdateSchema {
    pub id: String,
    #[serde(flatten)]
    pub state: Map<String, Value>,
}

/// Body of `POST /api/match/report`. Both fields are required; presence is
/// checked in the handler so the reject happens before any write.
#[derive(Debug, Deserialize)]
pub struct ReportRequestSchema {
    pub id: Option<String>,
    pub teams: Option<Vec<Team>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequestSchema {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureOrderSchema {
    pub draft_order: Vec<String>,
}
