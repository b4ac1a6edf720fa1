//! Partitioned persistence for the match aggregate.
//!
//! A match is stored as independently addressable sub-records so that
//! high-rate slices (pool edits during a live draft) never read-modify-write
//! the slow-changing core metadata. `crud_get_match_view` reassembles the
//! one logical record the API serves; absent sub-records collapse to their
//! documented defaults there, so callers never see "key not found".

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::draft::DraftBoard;
use crate::model::{MatchSummary, Player, Report, Team};
use crate::schema::MatchStatus;
use crate::store::{get_json, put_json, BatchOp, KeyValue, StoreError};

pub const MATCHES_LIST_KEY: &str = "matchesList";
pub const LEGACY_MATCH_KEY: &str = "matchData";
pub const INIT_DATA_KEY: &str = "initData";

pub const PART_TEAM: &str = "team";
pub const PART_POOL: &str = "pool";
pub const PART_DRAFT_ORDER: &str = "draftOrder";
pub const PART_STATE: &str = "state";
pub const PART_REPORT: &str = "report";

/// Structured aggregate slices that live in their own sub-records and must
/// never be merged into core metadata.
const STRUCTURED_FIELDS: [&str; 3] = ["teams", "pool", "draftOrder"];

pub fn core_key(id: &str) -> String {
    format!("matchData:{id}")
}

pub fn part_key(id: &str, part: &str) -> String {
    format!("{id}:{part}")
}

fn decode_value(bytes: Option<Vec<u8>>) -> Result<Option<Value>, StoreError> {
    Ok(match bytes {
        Some(bytes) => Some(serde_json::from_slice(&bytes)?),
        None => None,
    })
}

/// Merged view of one match aggregate.
///
/// Merge order follows the storage precedence: core metadata first, then
/// the structured slices, then the directory entry, then rotation state,
/// with `id` forced last. `None` means the id has never been written at
/// all, as opposed to "exists but empty".
pub fn crud_get_match_view(store: &dyn KeyValue, id: &str) -> Result<Option<Value>, StoreError> {
    let keys = [
        core_key(id),
        part_key(id, PART_TEAM),
        part_key(id, PART_POOL),
        part_key(id, PART_DRAFT_ORDER),
        part_key(id, PART_STATE),
        part_key(id, PART_REPORT),
    ];
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let mut raw = store.multi_get(&key_refs)?.into_iter();

    let core = decode_value(raw.next().flatten())?;
    let teams = decode_value(raw.next().flatten())?;
    let pool = decode_value(raw.next().flatten())?;
    let draft_order = decode_value(raw.next().flatten())?;
    let state = decode_value(raw.next().flatten())?;
    let report = decode_value(raw.next().flatten())?;

    let directory_entry = crud_list_matches(store)?.into_iter().find(|m| m.id == id);

    let never_written = core.is_none()
        && teams.is_none()
        && pool.is_none()
        && draft_order.is_none()
        && state.is_none()
        && report.is_none()
        && directory_entry.is_none();
    if never_written {
        return Ok(None);
    }

    let mut content = match core {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    content.insert("teams".to_owned(), teams.unwrap_or_else(|| json!([])));
    content.insert("pool".to_owned(), pool.unwrap_or_else(|| json!([])));
    content.insert(
        "draftOrder".to_owned(),
        draft_order.unwrap_or_else(|| json!([])),
    );
    if let Some(entry) = directory_entry {
        if let Value::Object(fields) = serde_json::to_value(entry)? {
            content.extend(fields);
        }
    }
    if let Some(Value::Object(fields)) = state {
        content.extend(fields);
    }
    content.insert("report".to_owned(), report.unwrap_or(Value::Null));
    content.insert("id".to_owned(), Value::String(id.to_owned()));

    Ok(Some(Value::Object(content)))
}

/// Partial update of one aggregate.
///
/// `teams`/`pool`/`draftOrder` overwrite their sub-records wholesale (no
/// array merge); every remaining field shallow-merges into the core
/// record. The core merge is read-modify-write and races under concurrent
/// writers; last write wins.
pub fn crud_put_partial(
    store: &dyn KeyValue,
    id: &str,
    mut fields: Map<String, Value>,
) -> Result<(), StoreError> {
    fields.remove("id");

    let mut ops = Vec::new();
    if let Some(teams) = fields.remove("teams") {
        ops.push(BatchOp::put_json(part_key(id, PART_TEAM), &teams)?);
    }
    if let Some(pool) = fields.remove("pool") {
        ops.push(BatchOp::put_json(part_key(id, PART_POOL), &pool)?);
    }
    if let Some(order) = fields.remove("draftOrder") {
        ops.push(BatchOp::put_json(part_key(id, PART_DRAFT_ORDER), &order)?);
    }

    if !fields.is_empty() {
        let key = core_key(id);
        let mut core: Map<String, Value> = get_json(store, &key)?.unwrap_or_default();
        core.extend(fields);
        for field in STRUCTURED_FIELDS {
            core.remove(field);
        }
        ops.push(BatchOp::put_json(key, &core)?);
    }

    if !ops.is_empty() {
        store.write_batch(ops)?;
    }
    Ok(())
}

/// The pre-directory singleton match, kept for old clients. Unqualified
/// key, merge-only writes.
pub fn crud_get_legacy_match(store: &dyn KeyValue) -> Result<Option<Value>, StoreError> {
    get_json(store, LEGACY_MATCH_KEY)
}

/// Merge `fields` into the legacy singleton and return the merged record
/// (the broadcast payload for legacy updates).
pub fn crud_put_legacy_match(
    store: &dyn KeyValue,
    fields: Map<String, Value>,
) -> Result<Value, StoreError> {
    let mut data: Map<String, Value> = get_json(store, LEGACY_MATCH_KEY)?.unwrap_or_default();
    data.extend(fields);
    put_json(store, LEGACY_MATCH_KEY, &data)?;
    Ok(Value::Object(data))
}

// --- typed sub-record access -----------------------------------------------

pub fn crud_get_teams(store: &dyn KeyValue, id: &str) -> Result<Vec<Team>, StoreError> {
    Ok(get_json(store, &part_key(id, PART_TEAM))?.unwrap_or_default())
}

pub fn crud_get_pool(store: &dyn KeyValue, id: &str) -> Result<Vec<Player>, StoreError> {
    Ok(get_json(store, &part_key(id, PART_POOL))?.unwrap_or_default())
}

pub fn crud_put_pool(store: &dyn KeyValue, id: &str, pool: &[Player]) -> Result<(), StoreError> {
    debug!("pool update for match {id} ({} players)", pool.len());
    put_json(store, &part_key(id, PART_POOL), &pool)
}

pub fn crud_get_draft_order(store: &dyn KeyValue, id: &str) -> Result<Vec<String>, StoreError> {
    Ok(get_json(store, &part_key(id, PART_DRAFT_ORDER))?.unwrap_or_default())
}

pub fn crud_put_draft_order(
    store: &dyn KeyValue,
    id: &str,
    order: &[String],
) -> Result<(), StoreError> {
    put_json(store, &part_key(id, PART_DRAFT_ORDER), &order)
}

/// Wholesale overwrite of the rotation-state sub-record with an untyped
/// field map, for the raw state endpoint.
pub fn crud_put_state_raw(
    store: &dyn KeyValue,
    id: &str,
    state: &Map<String, Value>,
) -> Result<(), StoreError> {
    put_json(store, &part_key(id, PART_STATE), state)
}

/// Load the drafting slice of an aggregate for the rotation engine.
pub fn crud_load_board(store: &dyn KeyValue, id: &str) -> Result<DraftBoard, StoreError> {
    Ok(DraftBoard {
        teams: crud_get_teams(store, id)?,
        pool: crud_get_pool(store, id)?,
        draft_order: crud_get_draft_order(store, id)?,
        state: get_json(store, &part_key(id, PART_STATE))?.unwrap_or_default(),
    })
}

/// Board write-back, one atomic batch so a crash cannot leave rosters,
/// pool and rotation index mutually inconsistent.
pub fn crud_store_board(
    store: &dyn KeyValue,
    id: &str,
    board: &DraftBoard,
) -> Result<(), StoreError> {
    store.write_batch(vec![
        BatchOp::put_json(part_key(id, PART_TEAM), &board.teams)?,
        BatchOp::put_json(part_key(id, PART_POOL), &board.pool)?,
        BatchOp::put_json(part_key(id, PART_DRAFT_ORDER), &board.draft_order)?,
        BatchOp::put_json(part_key(id, PART_STATE), &board.state)?,
    ])
}

// --- directory --------------------------------------------------------------

pub fn crud_list_matches(store: &dyn KeyValue) -> Result<Vec<MatchSummary>, StoreError> {
    Ok(get_json(store, MATCHES_LIST_KEY)?.unwrap_or_default())
}

pub fn crud_append_match(store: &dyn KeyValue, entry: MatchSummary) -> Result<(), StoreError> {
    let mut matches = crud_list_matches(store)?;
    matches.push(entry);
    put_json(store, MATCHES_LIST_KEY, &matches)
}

/// Replace one directory entry wholesale. `false` when the id is unknown.
pub fn crud_replace_match(store: &dyn KeyValue, entry: MatchSummary) -> Result<bool, StoreError> {
    let mut matches = crud_list_matches(store)?;
    match matches.iter_mut().find(|m| m.id == entry.id) {
        Some(slot) => {
            *slot = entry;
            put_json(store, MATCHES_LIST_KEY, &matches)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Overwrite the whole directory.
pub fn crud_overwrite_matches(
    store: &dyn KeyValue,
    matches: &[MatchSummary],
) -> Result<(), StoreError> {
    put_json(store, MATCHES_LIST_KEY, &matches)
}

fn sub_record_deletes(id: &str) -> Vec<BatchOp> {
    let mut ops: Vec<BatchOp> = [PART_TEAM, PART_POOL, PART_DRAFT_ORDER, PART_STATE, PART_REPORT]
        .iter()
        .map(|part| BatchOp::delete(part_key(id, part)))
        .collect();
    ops.push(BatchOp::delete(core_key(id)));
    ops
}

/// Remove a match from the directory and cascade-delete its sub-records
/// in the same batch. `false` when the id is unknown; already-absent
/// sub-records are fine.
pub fn crud_remove_match(store: &dyn KeyValue, id: &str) -> Result<bool, StoreError> {
    let mut matches = crud_list_matches(store)?;
    let before = matches.len();
    matches.retain(|m| m.id != id);
    if matches.len() == before {
        return Ok(false);
    }

    info!("deleting match {id}");
    let mut ops = vec![BatchOp::put_json(MATCHES_LIST_KEY, &matches)?];
    ops.extend(sub_record_deletes(id));
    store.write_batch(ops)?;
    Ok(true)
}

// --- finalize ---------------------------------------------------------------

/// One-way finalize: freeze the rosters into the report and purge the
/// drafting scratch space, all in one atomic batch. The directory entry
/// flips to `live`. Nothing reconstructs scratch data from a report.
pub fn crud_generate_report(
    store: &dyn KeyValue,
    id: &str,
    teams: Vec<Team>,
) -> Result<Report, StoreError> {
    let report = Report { teams };
    let mut ops = vec![
        BatchOp::put_json(part_key(id, PART_REPORT), &report)?,
        BatchOp::delete(part_key(id, PART_TEAM)),
        BatchOp::delete(part_key(id, PART_POOL)),
        BatchOp::delete(part_key(id, PART_DRAFT_ORDER)),
        BatchOp::delete(part_key(id, PART_STATE)),
    ];

    let mut matches = crud_list_matches(store)?;
    if let Some(entry) = matches.iter_mut().find(|m| m.id == id) {
        entry.status = MatchStatus::Live;
        ops.push(BatchOp::put_json(MATCHES_LIST_KEY, &matches)?);
    }

    store.write_batch(ops)?;
    info!("generated report for match {id}");
    Ok(report)
}

pub fn crud_get_report(store: &dyn KeyValue, id: &str) -> Result<Option<Report>, StoreError> {
    get_json(store, &part_key(id, PART_REPORT))
}

/// Startup seed, the one-shot import of the configured player universe.
/// Written once so operational tooling can diff later pool edits against
/// the original roster of the world.
pub fn crud_seed_init_data(store: &dyn KeyValue, pool: &[Player]) -> Result<(), StoreError> {
    if store.get_raw(INIT_DATA_KEY)?.is_none() {
        put_json(store, INIT_DATA_KEY, &json!({ "pool": pool }))?;
        info!("seeded initial player pool ({} players)", pool.len());
    }
    Ok(())
}
