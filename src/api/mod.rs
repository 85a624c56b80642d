//! HTTP surface: REST routes for posts and questions plus the WebSocket
//! endpoints that feed live subscribers.
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | GET | `/posts/{blog}` | newest page of posts |
//! | GET | `/posts/{blog}/before/{sequence}` | page ending at `sequence` |
//! | POST | `/posts/{blog}` | `201 {"postId": n}` |
//! | PUT | `/posts/{blog}/{sequence}` | `200` updated post |
//! | GET | `/posts/{blog}/questions` | open questions |
//! | POST | `/posts/{blog}/questions` | `201 {"questionId": id}` |
//! | DELETE | `/posts/{blog}/questions/{id}` | `201 {}` |
//! | GET | `/ws/posts`, `/ws/questions` | WebSocket subscription |
//! | GET | `/health` | subscriber counts |

mod error;
mod handlers;
mod ws;

pub use error::{ApiError, ApiResult};

use crate::broadcast::Broadcaster;
use crate::channels::{HubConfig, PushChannels};
use crate::config::BlogConfig;
use crate::content::ContentLog;
use crate::error::Result;
use crate::registry::JournalRegistry;
use crate::service::LiveBlog;
use axum::routing::{delete, get, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub blog: LiveBlog,
    pub channels: PushChannels,
}

impl AppState {
    /// Open the data directory and wire the content store, registry and
    /// channel hub together.
    pub fn open(config: BlogConfig, hub: HubConfig) -> Result<Self> {
        let content = Arc::new(ContentLog::open_or_create(&config)?);
        let registry = Arc::new(JournalRegistry::open_with_page_size(
            &config.path,
            config.registry_page_size,
        )?);

        let channels = PushChannels::new(registry.clone(), hub);
        let broadcaster = Broadcaster::new(registry, channels.hub().clone());
        info!(path = %config.path.display(), "live blog ready");

        Ok(Self {
            blog: LiveBlog::new(content, broadcaster, config),
            channels,
        })
    }
}

/// Build the router with permissive CORS on every route.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/posts/{blog}",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/posts/{blog}/before/{sequence}", get(handlers::list_posts_before))
        .route("/posts/{blog}/{sequence}", put(handlers::update_post))
        .route(
            "/posts/{blog}/questions",
            get(handlers::list_questions).post(handlers::create_question),
        )
        .route(
            "/posts/{blog}/questions/{question}",
            delete(handlers::delete_question),
        )
        .route("/ws/posts", get(ws::posts))
        .route("/ws/questions", get(ws::questions))
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}
