//! # Forum Example
//!
//! Two entities served by entity controllers: boards with the default domain
//! service, and posts with a custom service that scopes drafts and stamps
//! authors.
//!
//! Run with: `cargo run --example forum`, then open <http://localhost:3000/boards>.
//! Send `x-user` / `x-roles` headers to act as a signed-in user, and
//! `accept-content: application/json` to get JSON instead of HTML.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use crudmvc::{ControllerOptions, DefaultEntityDomainService, EntityController, ViewEngine};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema, Set,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod models;
use models::{board, post};

async fn setup_database() -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    // Force single connection to ensure in-memory DB stays alive
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    let schema = Schema::new(db.get_database_backend());
    db.execute(db.get_database_backend().build(&schema.create_table_from_entity(board::Entity)))
        .await?;
    db.execute(db.get_database_backend().build(&schema.create_table_from_entity(post::Entity)))
        .await?;

    seed_data(&db).await?;
    Ok(db)
}

async fn seed_data(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    let general = board::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("General".to_string()),
        description: Set(Some("Anything goes".to_string())),
        contact: Set(Some("mods@example.com".to_string())),
        homepage: Set(None),
        sort_order: Set(1),
    }
    .insert(db)
    .await?;

    for (title, state) in [
        ("Welcome to the forum", post::PostState::Published),
        ("House rules (draft)", post::PostState::Draft),
    ] {
        post::ActiveModel {
            id: Set(Uuid::new_v4()),
            board_id: Set(general.id),
            title: Set(title.to_string()),
            content: Set("<p>Be kind, stay on topic and have fun.</p>".to_string()),
            author: Set("admin".to_string()),
            state: Set(state),
            published_at: Set((state == post::PostState::Published).then(chrono::Utc::now)),
            views: Set(0),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,crudmvc=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let options = ControllerOptions::from_env();
    let views = Arc::new(ViewEngine::from_options(&options)?);
    let db = setup_database().await?;

    let boards = EntityController::<DefaultEntityDomainService<board::Model>>::new(
        db.clone(),
        Arc::clone(&views),
    )
    .with_options(options.clone());
    let posts = EntityController::with_service(post::PostService, db, views).with_options(options);

    let app = Router::new()
        .nest("/boards", boards.router())
        .nest("/posts", posts.router())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("Forum listening on http://localhost:3000");
    axum::serve(listener, app).await?;
    Ok(())
}
