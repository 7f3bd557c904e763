pub mod appresult;
pub mod auth;
pub mod booking;
pub mod config;
pub mod contact;
pub mod dashboard;
pub mod db;
pub mod edit_rooms;
pub mod events;
pub mod form;
pub mod home;
pub mod inbox;
pub mod mail;
pub mod res;
pub mod rooms;
pub mod session;
pub mod storage;

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};

use config::Config;
use events::BookingEvent;
use mail::Mailer;
use storage::Storage;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub config: Arc<Config>,
    pub storage: Storage,
    pub mailer: Mailer,
    pub tx: broadcast::Sender<BookingEvent>,
}

impl AppState {
    pub async fn new(config: Config, db_pool: SqlitePool) -> AppResult<AppState> {
        let clients = match &config.oauth_clients_file {
            Some(path) => {
                let json: Value = serde_json::from_str(&tokio::fs::read_to_string(path).await?)?;
                auth::Clients::from_json(json, &config.public_url)?
            }
            None => auth::Clients::default(),
        };
        tracing::info!(providers = ?clients.providers(), "oauth providers");

        let mailer = Mailer::new(config.emailjs.clone());
        if !mailer.is_enabled() {
            tracing::warn!("EMAILJS_SERVICE_ID/EMAILJS_PUBLIC_KEY not set, emails will be skipped");
        }

        Ok(AppState {
            db_pool,
            clients,
            storage: Storage::new(&config.storage_dir),
            mailer,
            tx: events::channel(),
            config: Arc::new(config),
        })
    }
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or_else(|| anyhow::anyhow!("expected {field} in {self}"))?
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }
}

pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.public_url.starts_with("https://"))
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(state.config.session_inactivity_minutes)));

    let uploads = ServeDir::new(state.storage.root());

    Router::new()
        .route("/", get(home::home))
        .route("/static/site.css", get(res::stylesheet))
        .route("/static/room-placeholder.svg", get(res::placeholder))
        .route("/terms-and-privacy", get(res::terms))

        .merge(auth::router())
        .merge(booking::router())
        .nest("/rooms", rooms::router())
        .nest("/contact", contact::router())
        .nest("/inbox", inbox::router())
        .nest("/dashboard", dashboard::router())
        .nest("/edit-rooms", edit_rooms::router())
        .nest_service(storage::PUBLIC_PREFIX, uploads)
        .fallback(res::not_found)

        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
