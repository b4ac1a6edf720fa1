//! Match-state storage and synchronization backend for live, multi-viewer
//! team drafts: a partitioned match aggregate in an embedded key-value
//! store, a pure pick-rotation engine, a one-way finalize/report
//! compaction, and fire-and-forget push broadcasting.

pub mod auth;
pub mod bus;
pub mod config;
pub mod crud;
pub mod draft;
pub mod error;
pub mod handler;
pub mod model;
pub mod route;
pub mod schema;
pub mod store;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use bus::Broadcaster;
use config::AppConfig;
use store::KeyValue;

/// Shared per-process state handed to every handler.
pub struct AppState {
    pub store: Arc<dyn KeyValue>,
    pub bus: Broadcaster,
    pub config: AppConfig,
    pub jwt_secret: String,
    pub connection_count: AtomicUsize,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValue>, config: AppConfig, jwt_secret: String) -> Self {
        Self {
            store,
            bus: Broadcaster::new(),
            config,
            jwt_secret,
            connection_count: AtomicUsize::new(0),
        }
    }
}
