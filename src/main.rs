//! Kaffero chat API
//!
//! Backend for the chat widget on the Kaffero marketing site. Answers
//! visitor questions from a fixed set of canned replies, keeps every
//! conversation, and flags visitors who leave an email or phone number as
//! sales leads for the staff dashboard.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod notify;
mod routes;

use config::Config;
use crate::core::{ChatEngine, ConversationStore, Responder};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat_engine: Arc<ChatEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kaffero_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let site = config.load_site()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let store = Arc::new(ConversationStore::new(&config.database_path()).await?);
    tracing::info!("Conversation store at {}", config.database_path().display());

    let notifier = notify::from_config(&site);
    tracing::info!("Reporting leads via {}", notifier.name());

    let responder = Arc::new(Responder::new(&site.company));
    let chat_engine = Arc::new(ChatEngine::new(responder, store, notifier));

    let state = AppState { chat_engine };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("{} chat API running at http://{}", site.site.name, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
