use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use crudmvc::{DefaultEntityDomainService, EntityController, ViewEngine};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use uuid::Uuid;

pub mod account_entity;
pub mod thread_entity;

use thread_entity::{ModeratedThreadService, ThreadStatus};

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn views() -> Arc<ViewEngine> {
    Arc::new(ViewEngine::new().expect("Built-in templates should compile"))
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let threads =
        EntityController::<DefaultEntityDomainService<thread_entity::Model>>::new(db, views());
    Router::new().nest("/threads", threads.router())
}

pub fn setup_account_app(db: DatabaseConnection) -> Router {
    let accounts =
        EntityController::<DefaultEntityDomainService<account_entity::Model>>::new(db, views());
    Router::new().nest("/accounts", accounts.router())
}

pub fn setup_moderated_app(db: DatabaseConnection) -> Router {
    let threads = EntityController::with_service(ModeratedThreadService, db, views());
    Router::new().nest("/moderated", threads.router())
}

pub async fn seed_thread(
    db: &DatabaseConnection,
    title: &str,
    pinned: bool,
    status: ThreadStatus,
) -> thread_entity::Model {
    thread_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        body: Set(Some(format!("About {title}"))),
        pinned: Set(pinned),
        status: Set(status),
        replies: Set(3),
        secret: Set(Some(format!("{title} is being watched"))),
    }
    .insert(db)
    .await
    .expect("Failed to seed thread")
}

pub async fn seed_account(
    db: &DatabaseConnection,
    name: &str,
    password: &str,
) -> account_entity::Model {
    account_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        password: Set(password.to_string()),
    }
    .insert(db)
    .await
    .expect("Failed to seed account")
}

pub fn json_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("accept-content", "application/json")
        .body(Body::empty())
        .unwrap()
}

pub fn html_get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn form_post(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateThreadTable), Box::new(CreateAccountTable)]
    }
}

pub struct CreateThreadTable;

#[async_trait::async_trait]
impl MigrationName for CreateThreadTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_thread_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateThreadTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(Threads::Table)
            .if_not_exists()
            .col(ColumnDef::new(Threads::Id).uuid().not_null().primary_key())
            .col(ColumnDef::new(Threads::Title).string().not_null())
            .col(ColumnDef::new(Threads::Body).text().null())
            .col(
                ColumnDef::new(Threads::Pinned)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(
                ColumnDef::new(Threads::Status)
                    .string_len(16)
                    .not_null()
                    .default("open"),
            )
            .col(
                ColumnDef::new(Threads::Replies)
                    .integer()
                    .not_null()
                    .default(0),
            )
            .col(ColumnDef::new(Threads::Secret).string().null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Threads::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Threads {
    Table,
    Id,
    Title,
    Body,
    Pinned,
    Status,
    Replies,
    Secret,
}

pub struct CreateAccountTable;

#[async_trait::async_trait]
impl MigrationName for CreateAccountTable {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_account_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateAccountTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(Accounts::Table)
            .if_not_exists()
            .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
            .col(ColumnDef::new(Accounts::Name).string().not_null())
            .col(ColumnDef::new(Accounts::Password).string().not_null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    Password,
}
