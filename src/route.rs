use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::middleware;
use axum::routing::{any, delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::{auth_middleware, login_handler};
use crate::handler::{
    assign_player_handler, configure_order_handler, create_match_handler, delete_match_handler,
    generate_report_handler, get_config_handler, get_legacy_match_handler, get_match_by_id_handler,
    get_matches_handler, get_report_handler, handle_websocket, overwrite_matches_handler,
    save_draft_order_handler, save_pool_handler, save_state_handler, undo_pick_handler,
    update_match_handler, update_match_partial_handler, update_teams_handler,
};
use crate::AppState;

/// The full application router: `/login` and the push channel are public,
/// everything under `/api` sits behind the bearer gate.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let trace_layer =
        TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    let api = Router::new()
        .route("/config", get(get_config_handler))
        .route(
            "/matches",
            get(get_matches_handler)
                .post(create_match_handler)
                .patch(update_match_handler)
                .put(overwrite_matches_handler),
        )
        .route("/matches/:match_id", delete(delete_match_handler))
        .route(
            "/match",
            get(get_legacy_match_handler).post(update_match_partial_handler),
        )
        .route("/match/pool", post(save_pool_handler))
        .route("/match/draftOrder", post(save_draft_order_handler))
        .route("/match/state", post(save_state_handler))
        .route("/match/report", post(generate_report_handler))
        .route("/match/:match_id", get(get_match_by_id_handler))
        .route("/match/:match_id/report", get(get_report_handler))
        .route("/match/:match_id/teams", put(update_teams_handler))
        .route("/match/:match_id/assign", post(assign_player_handler))
        .route("/match/:match_id/undo", post(undo_pick_handler))
        .route("/match/:match_id/order", post(configure_order_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/login", post(login_handler))
        .route("/ws", any(handle_websocket))
        .nest("/api", api)
        .layer(cors)
        .layer(trace_layer)
        .with_state(state)
}
