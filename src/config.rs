//! Static deployment configuration: login members, the player universe,
//! team templates. Loaded once at startup from `config.json`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Player, Team};

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub account: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub match_date: String,
    pub slots_per_team: u32,
    pub initial_teams: Vec<Team>,
    pub player_pool: Vec<Player>,
    pub members: Vec<Member>,
}

/// The projection served by `GET /api/config`. Members never leave the
/// server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredConfig {
    pub match_date: String,
    pub slots_per_team: u32,
    pub initial_teams: Vec<Team>,
    pub player_pool: Vec<Player>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn filtered(&self) -> FilteredConfig {
        FilteredConfig {
            match_date: self.match_date.clone(),
            slots_per_team: self.slots_per_team,
            initial_teams: self.initial_teams.clone(),
            player_pool: self.player_pool.clone(),
        }
    }
}
