use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod store;

use crate::config::{Config, StoreType};
use crate::db::DatabasePool;
use crate::services::ContainerService;
use crate::store::{ContainerStore, DatabaseContainerStore, MemoryContainerStore};

pub type AppState = Arc<ContainerService>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rolloff_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rolloff server...");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config);

    let store: Arc<dyn ContainerStore> = match config.store.store_type {
        StoreType::Memory => {
            info!("Using in-memory container store; records are lost on restart");
            Arc::new(MemoryContainerStore::new())
        }
        StoreType::Database => {
            let db_pool = DatabasePool::new(&config.database).await?;
            info!("Database connection established ({})", db_pool.backend_name());

            db_pool.migrate().await?;
            info!("Database migrations completed");

            Arc::new(DatabaseContainerStore::new(db_pool))
        }
    };

    let container_service = Arc::new(ContainerService::new(store));
    if container_service.seed_if_empty().await? {
        info!("Seeded sample container");
    }

    let app = app(container_service);

    // Start server
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub(crate) fn app(app_state: AppState) -> Router {
    // Literal sub-paths go ahead of the `:id` capture
    let api_routes = Router::new()
        .route(
            "/containers",
            get(handlers::list_containers).post(handlers::create_container),
        )
        .route(
            "/containers/archived",
            get(handlers::list_archived_containers),
        )
        .route("/containers/search", get(handlers::search_containers))
        .route(
            "/containers/:id",
            get(handlers::get_container)
                .put(handlers::update_container)
                .delete(handlers::delete_container),
        )
        .with_state(app_state);

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any)
                        .allow_credentials(false),
                ),
        )
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "T&D Rolloff API is running!" }))
}

async fn health_check() -> &'static str {
    "OK"
}
