use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::{require_admin, Claims};
use crate::crud::{
    crud_append_match, crud_generate_report, crud_get_legacy_match, crud_get_match_view,
    crud_get_report, crud_list_matches, crud_load_board, crud_overwrite_matches, crud_put_draft_order,
    crud_put_legacy_match, crud_put_partial, crud_put_pool, crud_put_state_raw, crud_remove_match,
    crud_replace_match, crud_store_board,
};
use crate::draft::DraftBoard;
use crate::error::AppError;
use crate::model::{MatchSummary, Team};
use crate::schema::{
    AssignRequestSchema, ConfigureOrderSchema, CreateMatchSchema, DraftOrderUpdateSchema,
    MatchStatus, PoolUpdateSchema, ReportRequestSchema, StateUpdateSchema,
};
use crate::AppState;

/// Fields of the merged view that stay admin-only while a match is still
/// being prepared.
const DRAFT_VIEW_FIELDS: [&str; 7] = [
    "teams",
    "pool",
    "draftOrder",
    "currentOrderIndex",
    "activeTeamId",
    "picks",
    "report",
];

pub async fn get_config_handler(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(data.config.filtered()))
}

pub async fn get_legacy_match_handler(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let content = crud_get_legacy_match(data.store.as_ref())?;
    Ok(Json(json!({ "result": true, "content": content })))
}

pub async fn get_match_by_id_handler(
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let mut content = crud_get_match_view(data.store.as_ref(), &match_id)?;

    if let Some(Value::Object(view)) = content.as_mut() {
        let status = view
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| MatchStatus::try_from(s).ok());
        let withhold = status.is_some_and(|s| !s.draft_visible_to_viewers()) && !claims.is_admin();
        if withhold {
            // header-only view until drafting opens to the public
            for field in DRAFT_VIEW_FIELDS {
                view.remove(field);
            }
        }
    }

    Ok(Json(json!({ "result": true, "content": content })))
}

/// `POST /api/match`: partial aggregate update. With an id the structured
/// slices overwrite their sub-records and the rest merges into core; the
/// delta is pushed as-is. Without an id this falls back to the legacy
/// singleton, whose merged record is pushed instead.
pub async fn update_match_partial_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    match body.get("id").and_then(Value::as_str).map(str::to_owned) {
        Some(id) => {
            let mut delta = body.clone();
            delta.remove("id");
            crud_put_partial(data.store.as_ref(), &id, body)?;
            data.bus.publish(&id, delta);
        }
        None => {
            let merged = crud_put_legacy_match(data.store.as_ref(), body)?;
            data.bus.publish_raw(merged);
        }
    }

    Ok(Json(json!({ "result": true })))
}

pub async fn save_pool_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<PoolUpdateSchema>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    crud_put_pool(data.store.as_ref(), &body.id, &body.pool)?;

    let mut delta = Map::new();
    delta.insert("pool".to_owned(), serde_json::to_value(&body.pool)?);
    data.bus.publish(&body.id, delta);
    Ok(Json(json!({ "result": true })))
}

pub async fn save_draft_order_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<DraftOrderUpdateSchema>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    crud_put_draft_order(data.store.as_ref(), &body.id, &body.draft_order)?;

    let mut delta = Map::new();
    delta.insert("draftOrder".to_owned(), serde_json::to_value(&body.draft_order)?);
    data.bus.publish(&body.id, delta);
    Ok(Json(json!({ "result": true })))
}

pub async fn save_state_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<StateUpdateSchema>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    crud_put_state_raw(data.store.as_ref(), &body.id, &body.state)?;
    data.bus.publish(&body.id, body.state);
    Ok(Json(json!({ "result": true })))
}

pub async fn generate_report_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<ReportRequestSchema>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    let (Some(id), Some(teams)) = (body.id, body.teams) else {
        return Err(AppError::Validation("Missing id or teams".to_owned()));
    };
    if teams.is_empty() {
        return Err(AppError::Validation(
            "Report requires at least one team".to_owned(),
        ));
    }

    let report = crud_generate_report(data.store.as_ref(), &id, teams)?;

    let mut delta = Map::new();
    delta.insert("report".to_owned(), serde_json::to_value(&report)?);
    delta.insert("status".to_owned(), serde_json::to_value(MatchStatus::Live)?);
    data.bus.publish(&id, delta);
    Ok(Json(json!({ "result": true })))
}

pub async fn get_report_handler(
    Path(match_id): Path<String>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let content = crud_get_report(data.store.as_ref(), &match_id)?;
    Ok(Json(json!({ "result": true, "content": content })))
}

pub async fn get_matches_handler(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let content = crud_list_matches(data.store.as_ref())?;
    Ok(Json(json!({ "result": true, "content": content })))
}

pub async fn create_match_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<CreateMatchSchema>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    let entry = MatchSummary {
        id: Uuid::new_v4().to_string(),
        title: body.title,
        date: body.date,
        status: body.status,
        description: body.description,
    };
    let id = entry.id.clone();
    crud_append_match(data.store.as_ref(), entry)?;
    info!("created match {id}");
    Ok(Json(json!({ "result": true, "id": id })))
}

pub async fn update_match_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<MatchSummary>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    if !crud_replace_match(data.store.as_ref(), body.clone())? {
        return Err(AppError::NotFound("Match"));
    }

    let mut delta = match serde_json::to_value(&body)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    delta.remove("id");
    data.bus.publish(&body.id, delta);
    Ok(Json(json!({ "result": true })))
}

pub async fn overwrite_matches_handler(
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<Vec<MatchSummary>>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    crud_overwrite_matches(data.store.as_ref(), &body)?;
    Ok(Json(json!({ "result": true })))
}

pub async fn delete_match_handler(
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    if !crud_remove_match(data.store.as_ref(), &match_id)? {
        return Err(AppError::NotFound("Match"));
    }
    Ok(Json(json!({ "result": true })))
}

/// `PUT /api/match/:id/teams`: swap in an edited team list. Deleting a
/// team also resets the order and rotation state, and the push carries
/// the reset so viewers drop their stale order immediately.
pub async fn update_teams_handler(
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(teams): Json<Vec<Team>>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    let mut board = crud_load_board(data.store.as_ref(), &match_id)?;
    let reset = board.replace_teams(teams);
    crud_store_board(data.store.as_ref(), &match_id, &board)?;

    let mut delta = Map::new();
    delta.insert("teams".to_owned(), serde_json::to_value(&board.teams)?);
    if reset {
        delta.insert("draftOrder".to_owned(), json!([]));
        delta.insert("currentOrderIndex".to_owned(), json!(0));
        delta.insert("activeTeamId".to_owned(), Value::Null);
    }
    data.bus.publish(&match_id, delta);
    Ok(Json(json!({ "result": true })))
}

fn board_delta(board: &DraftBoard) -> Result<Map<String, Value>, AppError> {
    let mut delta = Map::new();
    delta.insert("teams".to_owned(), serde_json::to_value(&board.teams)?);
    delta.insert("pool".to_owned(), serde_json::to_value(&board.pool)?);
    delta.insert(
        "currentOrderIndex".to_owned(),
        serde_json::to_value(board.state.current_order_index)?,
    );
    delta.insert(
        "activeTeamId".to_owned(),
        serde_json::to_value(&board.state.active_team_id)?,
    );
    Ok(delta)
}

/// `POST /api/match/:id/assign`: hand the named pool player to whichever
/// team the rotation points at. Roster, pool and rotation state persist as
/// one batch before the push goes out.
pub async fn assign_player_handler(
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<AssignRequestSchema>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    let mut board = crud_load_board(data.store.as_ref(), &match_id)?;
    let pick = board.assign_next(&body.name)?;
    if pick.is_some() {
        crud_store_board(data.store.as_ref(), &match_id, &board)?;
        data.bus.publish(&match_id, board_delta(&board)?);
    }
    Ok(Json(json!({ "result": true, "picked": pick.is_some() })))
}

/// `POST /api/match/:id/undo`: revert the most recent pick.
pub async fn undo_pick_handler(
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    let mut board = crud_load_board(data.store.as_ref(), &match_id)?;
    let undone = board.undo_last_pick()?;
    if undone.is_some() {
        crud_store_board(data.store.as_ref(), &match_id, &board)?;
        data.bus.publish(&match_id, board_delta(&board)?);
    }
    Ok(Json(json!({ "result": true, "undone": undone.is_some() })))
}

/// `POST /api/match/:id/order`: commit a fully-assigned draft order and
/// restart the rotation.
pub async fn configure_order_handler(
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    State(data): State<Arc<AppState>>,
    Json(body): Json<ConfigureOrderSchema>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&claims)?;

    let mut board = crud_load_board(data.store.as_ref(), &match_id)?;
    board.configure_order(body.draft_order);
    crud_store_board(data.store.as_ref(), &match_id, &board)?;

    let mut delta = Map::new();
    delta.insert("draftOrder".to_owned(), serde_json::to_value(&board.draft_order)?);
    delta.insert(
        "currentOrderIndex".to_owned(),
        serde_json::to_value(board.state.current_order_index)?,
    );
    delta.insert(
        "activeTeamId".to_owned(),
        serde_json::to_value(&board.state.active_team_id)?,
    );
    data.bus.publish(&match_id, delta);
    Ok(Json(json!({ "result": true })))
}

pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket_connection(socket, state))
}

async fn handle_socket_connection(socket: WebSocket, state: Arc<AppState>) {
    // Subscribe to the broadcast bus; everything published from here on
    // is forwarded to this viewer.
    let mut rx = state.bus.subscribe();

    let current_connections = state.connection_count.fetch_add(1, Ordering::SeqCst);
    tracing::info!(
        "New connection. Total connections: {}",
        current_connections + 1
    );

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Forward pushes until the socket dies. A failed send (or a hopeless
    // lag on the channel) prunes this subscriber; the client refetches on
    // reconnect.
    let mut send_task = tokio::spawn(async move {
        while let Ok(payload) = rx.recv().await {
            if let Ok(msg) = serde_json::to_string(&payload) {
                if sender.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Viewers never speak on this channel; drain incoming frames so the
    // disconnect is noticed.
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(_)) = receiver.next().await {}
    });

    // Wait for either task to finish and then cleanup
    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    };

    let remaining = state.connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
    tracing::info!("Connection closed. Remaining connections: {}", remaining);
}
