// Integration tests for the draft backend.
//
// These exercise the library crate end-to-end over the in-memory store:
// directory lifecycle, partitioned reads and writes, the rotation engine
// against persisted boards, report compaction, and the broadcast bus.

use draft_backend::bus::Broadcaster;
use draft_backend::crud::{
    crud_append_match, crud_generate_report, crud_get_legacy_match, crud_get_match_view,
    crud_get_report, crud_list_matches, crud_load_board, crud_put_legacy_match, crud_put_partial,
    crud_remove_match, crud_replace_match, crud_store_board,
};
use draft_backend::draft::{DraftBoard, OrderSlots};
use draft_backend::model::{MatchSummary, Player, PlayerRole, Team};
use draft_backend::schema::MatchStatus;
use draft_backend::store::MemoryStore;
use serde_json::{json, Map, Value};

// ===========================================================================
// Test helpers
// ===========================================================================

fn player(name: &str) -> Player {
    Player {
        name: name.to_owned(),
        role: PlayerRole::P,
        region: Some("EU".to_owned()),
        subs: vec!["1".to_owned()],
        mvps: 1,
        kd: 1.2,
        wins: 10,
        win_rate: "55%".to_owned(),
    }
}

fn team(id: &str, slots: u32) -> Team {
    Team {
        id: id.to_owned(),
        name: format!("Team {id}"),
        color: Some("#00ff00".to_owned()),
        slots,
        players: Vec::new(),
    }
}

fn summary(id: &str) -> MatchSummary {
    MatchSummary {
        id: id.to_owned(),
        title: "Weekly Scrim".to_owned(),
        date: "2026-08-08".to_owned(),
        status: MatchStatus::Preparing,
        description: "bo3".to_owned(),
    }
}

fn roster<'a>(view: &'a Value, team_idx: usize) -> Vec<&'a str> {
    view["teams"][team_idx]["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect()
}

// ===========================================================================
// End-to-end drafting flow
// ===========================================================================

#[test]
fn full_draft_lifecycle_from_creation_to_report() {
    let store = MemoryStore::new();
    crud_append_match(&store, summary("m1")).unwrap();

    // set up teams, pool and the order via the slot builder
    let teams = vec![team("A", 2), team("B", 1)];
    let mut slots = OrderSlots::new(&teams);
    for id in ["A", "A", "B"] {
        slots.assign(&teams, id).unwrap();
    }
    let mut board = DraftBoard {
        teams,
        pool: vec![player("p1"), player("p2"), player("p3")],
        ..DraftBoard::default()
    };
    board.configure_order(slots.into_order().unwrap());
    crud_store_board(&store, "m1", &board).unwrap();

    // run the whole rotation the way the handlers do: load, mutate, store
    for name in ["p1", "p2", "p3"] {
        let mut board = crud_load_board(&store, "m1").unwrap();
        assert!(board.assign_next(name).unwrap().is_some());
        crud_store_board(&store, "m1", &board).unwrap();
    }

    let view = crud_get_match_view(&store, "m1").unwrap().unwrap();
    assert_eq!(roster(&view, 0), vec!["p1", "p2"]);
    assert_eq!(roster(&view, 1), vec!["p3"]);
    assert_eq!(view["pool"], json!([]));
    assert_eq!(view["currentOrderIndex"], json!(0));
    assert_eq!(view["activeTeamId"], json!("A"));
    assert_eq!(view["title"], json!("Weekly Scrim"));

    // finalize: the report is the sole survivor
    let board = crud_load_board(&store, "m1").unwrap();
    crud_generate_report(&store, "m1", board.teams).unwrap();

    let report = crud_get_report(&store, "m1").unwrap().unwrap();
    assert_eq!(report.teams.len(), 2);
    assert_eq!(report.teams[0].players.len(), 2);

    let view = crud_get_match_view(&store, "m1").unwrap().unwrap();
    assert_eq!(view["teams"], json!([]));
    assert_eq!(view["pool"], json!([]));
    assert_eq!(view["draftOrder"], json!([]));
    assert_eq!(view["status"], json!("live"));
    assert!(view["report"]["teams"].is_array());
    assert_eq!(crud_list_matches(&store).unwrap()[0].status, MatchStatus::Live);
}

#[test]
fn undo_round_trips_through_the_store() {
    let store = MemoryStore::new();
    let mut board = DraftBoard {
        teams: vec![team("A", 1), team("B", 1)],
        pool: vec![player("p1"), player("p2")],
        ..DraftBoard::default()
    };
    board.configure_order(vec!["A".to_owned(), "B".to_owned()]);
    crud_store_board(&store, "m1", &board).unwrap();

    let mut board = crud_load_board(&store, "m1").unwrap();
    board.assign_next("p2").unwrap();
    crud_store_board(&store, "m1", &board).unwrap();

    // a later request sees the persisted pick log and can undo it
    let mut board = crud_load_board(&store, "m1").unwrap();
    let undone = board.undo_last_pick().unwrap().unwrap();
    assert_eq!(undone.player_name, "p2");
    crud_store_board(&store, "m1", &board).unwrap();

    let board = crud_load_board(&store, "m1").unwrap();
    assert!(board.teams.iter().all(|t| t.players.is_empty()));
    assert_eq!(board.pool.len(), 2);
    assert_eq!(board.state.current_order_index, 0);
    assert_eq!(board.state.active_team_id.as_deref(), Some("A"));
    assert!(board.state.picks.is_empty());
}

#[test]
fn deleting_a_team_resets_the_persisted_rotation() {
    let store = MemoryStore::new();
    let mut board = DraftBoard {
        teams: vec![team("A", 1), team("B", 1)],
        pool: vec![player("p1")],
        ..DraftBoard::default()
    };
    board.configure_order(vec!["A".to_owned(), "B".to_owned()]);
    crud_store_board(&store, "m1", &board).unwrap();

    let mut board = crud_load_board(&store, "m1").unwrap();
    assert!(board.replace_teams(vec![team("A", 1)]));
    crud_store_board(&store, "m1", &board).unwrap();

    let board = crud_load_board(&store, "m1").unwrap();
    assert!(board.draft_order.is_empty());
    assert_eq!(board.state.current_order_index, 0);
    assert!(board.state.active_team_id.is_none());
}

// ===========================================================================
// Partitioned store behavior through the public API
// ===========================================================================

#[test]
fn partial_update_round_trips_each_slice_independently() {
    let store = MemoryStore::new();

    let mut fields = Map::new();
    fields.insert("id".to_owned(), json!("m1"));
    fields.insert("pool".to_owned(), serde_json::to_value(vec![player("p1")]).unwrap());
    fields.insert("title".to_owned(), json!("Core Title"));
    crud_put_partial(&store, "m1", fields).unwrap();

    let view = crud_get_match_view(&store, "m1").unwrap().unwrap();
    assert_eq!(view["pool"][0]["name"], json!("p1"));
    assert_eq!(view["title"], json!("Core Title"));
    assert_eq!(view["teams"], json!([]));

    // a second partial touching only core leaves the pool alone
    let mut fields = Map::new();
    fields.insert("description".to_owned(), json!("updated"));
    crud_put_partial(&store, "m1", fields).unwrap();

    let view = crud_get_match_view(&store, "m1").unwrap().unwrap();
    assert_eq!(view["pool"][0]["name"], json!("p1"));
    assert_eq!(view["description"], json!("updated"));
}

#[test]
fn unknown_ids_read_as_null_content_not_errors() {
    let store = MemoryStore::new();
    assert!(crud_get_match_view(&store, "unknown-id").unwrap().is_none());
    assert!(crud_get_report(&store, "unknown-id").unwrap().is_none());
    assert!(crud_list_matches(&store).unwrap().is_empty());
    assert!(crud_get_legacy_match(&store).unwrap().is_none());
}

#[test]
fn directory_replace_is_wholesale_and_remove_cascades() {
    let store = MemoryStore::new();
    crud_append_match(&store, summary("m1")).unwrap();
    crud_append_match(&store, summary("m2")).unwrap();

    let mut edited = summary("m1");
    edited.status = MatchStatus::Ended;
    edited.title = "Archived".to_owned();
    assert!(crud_replace_match(&store, edited).unwrap());

    let listed = crud_list_matches(&store).unwrap();
    assert_eq!(listed[0].status, MatchStatus::Ended);
    assert_eq!(listed[0].title, "Archived");

    assert!(crud_remove_match(&store, "m1").unwrap());
    let listed = crud_list_matches(&store).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "m2");
    assert!(crud_get_match_view(&store, "m1").unwrap().is_none());
}

#[test]
fn legacy_singleton_accumulates_fields() {
    let store = MemoryStore::new();
    let mut fields = Map::new();
    fields.insert("title".to_owned(), json!("Old Client"));
    crud_put_legacy_match(&store, fields).unwrap();

    let mut fields = Map::new();
    fields.insert("date".to_owned(), json!("2026-08-06"));
    crud_put_legacy_match(&store, fields).unwrap();

    let legacy = crud_get_legacy_match(&store).unwrap().unwrap();
    assert_eq!(legacy["title"], json!("Old Client"));
    assert_eq!(legacy["date"], json!("2026-08-06"));
}

// ===========================================================================
// Broadcast bus
// ===========================================================================

#[tokio::test]
async fn pushes_carry_sequence_numbers_viewers_can_gap_check() {
    let bus = Broadcaster::new();
    let mut viewer = bus.subscribe();

    for round in 0..3 {
        let mut delta = Map::new();
        delta.insert("currentOrderIndex".to_owned(), json!(round));
        bus.publish("m1", delta);
    }

    let mut last_seq = 0;
    for _ in 0..3 {
        let push = viewer.recv().await.unwrap();
        assert_eq!(push["id"], json!("m1"));
        let seq = push["seq"].as_u64().unwrap();
        // contiguous: a reconnecting client spotting a jump refetches
        assert_eq!(seq, last_seq + 1);
        last_seq = seq;
    }
}

#[tokio::test]
async fn a_disconnected_viewer_misses_pushes_permanently() {
    let bus = Broadcaster::new();

    {
        let _viewer = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }
    assert_eq!(bus.subscriber_count(), 0);

    // published while nobody listens: gone, by design
    bus.publish("m1", Map::new());

    let mut viewer = bus.subscribe();
    let mut delta = Map::new();
    delta.insert("pool".to_owned(), json!([]));
    bus.publish("m1", delta);

    // the new subscriber only sees the post-subscription push, and its seq
    // reveals that an earlier one existed
    let push = viewer.recv().await.unwrap();
    assert_eq!(push["seq"], json!(2));
}
