//! Pick-rotation logic. Pure state in, state out; persistence and
//! broadcasting stay in the handler layer so this module can be exercised
//! without a store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{PickRecord, Player, RotationState, Team};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("player {0:?} is not in the pool")]
    PlayerNotInPool(String),
    #[error("draft order references unknown team {0:?}")]
    UnknownTeam(String),
    #[error("team {0:?} is already at capacity in the draft order")]
    TeamAtCapacity(String),
    #[error("draft order has unassigned slots")]
    IncompleteOrder,
}

/// The drafting slice of one match aggregate: rosters, the shared pool,
/// the committed order and the rotation bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftBoard {
    pub teams: Vec<Team>,
    pub pool: Vec<Player>,
    pub draft_order: Vec<String>,
    pub state: RotationState,
}

impl DraftBoard {
    /// The team holding the next pick, `None` until an order is committed.
    pub fn active_team_id(&self) -> Option<&str> {
        if self.draft_order.is_empty() {
            return None;
        }
        let index = self.state.current_order_index % self.draft_order.len();
        Some(self.draft_order[index].as_str())
    }

    fn recompute_active(&mut self) {
        self.state.active_team_id = self.active_team_id().map(str::to_owned);
    }

    /// Assign the named pool player to whichever team the rotation points
    /// at, advancing the rotation by one step.
    ///
    /// With no committed order this is a deliberate no-op, not an error:
    /// the board simply is not accepting picks yet.
    pub fn assign_next(&mut self, player_name: &str) -> Result<Option<PickRecord>, DraftError> {
        let order_len = self.draft_order.len();
        if order_len == 0 {
            return Ok(None);
        }
        let Some(pos) = self.pool.iter().position(|p| p.name == player_name) else {
            return Err(DraftError::PlayerNotInPool(player_name.to_owned()));
        };

        let index = self.state.current_order_index % order_len;
        let team_id = self.draft_order[index].clone();
        let Some(team) = self.teams.iter_mut().find(|t| t.id == team_id) else {
            return Err(DraftError::UnknownTeam(team_id));
        };

        let player = self.pool.remove(pos);
        team.players.push(player);

        let pick = PickRecord {
            order_index: index,
            team_id,
            player_name: player_name.to_owned(),
        };
        self.state.picks.push(pick.clone());
        self.state.current_order_index = (index + 1) % order_len;
        self.recompute_active();
        Ok(Some(pick))
    }

    /// Undo the most recent pick by popping the pick log and rewinding the
    /// rotation to the logged slot. Modulo arithmetic lets undo cycle
    /// backward through a completed rotation.
    ///
    /// Removal is by player name, so a roster edited out-of-band since the
    /// pick cannot make undo evict the wrong player. With nothing picked
    /// yet (or no order committed) this is a no-op.
    pub fn undo_last_pick(&mut self) -> Result<Option<PickRecord>, DraftError> {
        if self.draft_order.is_empty() {
            return Ok(None);
        }
        let Some(pick) = self.state.picks.last().cloned() else {
            return Ok(None);
        };
        let Some(team) = self.teams.iter_mut().find(|t| t.id == pick.team_id) else {
            // replace_teams resets the log when a team disappears, so this
            // only fires if the state sub-record was edited out-of-band.
            return Err(DraftError::UnknownTeam(pick.team_id));
        };

        if let Some(pos) = team.players.iter().position(|p| p.name == pick.player_name) {
            let player = team.players.remove(pos);
            self.pool.push(player);
        }
        self.state.picks.pop();
        self.state.current_order_index = pick.order_index;
        self.recompute_active();
        Ok(Some(pick))
    }

    /// Commit a fully-assigned order and restart the rotation. Any pick
    /// history belongs to the previous order's geometry and is discarded.
    pub fn configure_order(&mut self, order: Vec<String>) {
        self.draft_order = order;
        self.state = RotationState::default();
        self.recompute_active();
    }

    /// Swap in an edited team list. Deleting a team invalidates the
    /// committed order, so order and rotation state reset rather than keep
    /// a dangling reference. Returns whether that reset happened.
    pub fn replace_teams(&mut self, new_teams: Vec<Team>) -> bool {
        let team_deleted = self
            .teams
            .iter()
            .any(|old| !new_teams.iter().any(|new| new.id == old.id));
        self.teams = new_teams;
        if team_deleted {
            self.draft_order.clear();
            self.state = RotationState::default();
        }
        team_deleted
    }
}

/// Slot-by-slot construction of a draft order. Per-team caps are enforced
/// as each slot is assigned; a partially built order cannot be committed.
#[derive(Debug, Clone)]
pub struct OrderSlots {
    slots: Vec<Option<String>>,
}

impl OrderSlots {
    /// One slot per roster seat across all teams.
    pub fn new(teams: &[Team]) -> Self {
        let total: usize = teams.iter().map(|t| t.slots as usize).sum();
        Self {
            slots: vec![None; total],
        }
    }

    /// Fill the first empty slot with `team_id`, refusing once the team
    /// already occupies as many slots as it has roster seats. With every
    /// slot taken this is a no-op.
    pub fn assign(&mut self, teams: &[Team], team_id: &str) -> Result<(), DraftError> {
        let Some(team) = teams.iter().find(|t| t.id == team_id) else {
            return Err(DraftError::UnknownTeam(team_id.to_owned()));
        };
        let count = self
            .slots
            .iter()
            .flatten()
            .filter(|id| id.as_str() == team_id)
            .count();
        if count >= team.slots as usize {
            return Err(DraftError::TeamAtCapacity(team_id.to_owned()));
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(team_id.to_owned());
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// The committed order; fails while any slot is unassigned.
    pub fn into_order(self) -> Result<Vec<String>, DraftError> {
        self.slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(DraftError::IncompleteOrder)
    }
}
