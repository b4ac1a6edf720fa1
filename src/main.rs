use std::sync::Arc;

use draft_backend::config::AppConfig;
use draft_backend::crud::crud_seed_init_data;
use draft_backend::route::build_router;
use draft_backend::store::{KeyValue, RocksStore};
use draft_backend::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "./data/draftdb".to_owned());
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "./config.json".to_owned());

    let config = AppConfig::load(&config_path).expect("can't load config file");
    let store: Arc<dyn KeyValue> =
        Arc::new(RocksStore::open(&db_path).expect("can't open database"));

    // One-shot import of the configured player universe.
    crud_seed_init_data(store.as_ref(), &config.player_pool).expect("can't seed database");

    let state = Arc::new(AppState::new(store, config, jwt_secret));
    let app = build_router(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_owned());
    let listener = TcpListener::bind(&addr).await.unwrap();
    tracing::debug!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
