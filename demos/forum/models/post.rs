use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crudmvc::{
    ApiError, CustomDataType, DomainContext, EntityDomainService, EntityMetadata, EntityResource,
    EnumDisplay, PropertyMetadata, Validatable, ValidationError, ValidationErrors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PostState {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "hidden")]
    Hidden,
}

impl EnumDisplay for PostState {}

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub author: String,
    pub state: PostState,
    pub published_at: Option<DateTime<Utc>>,
    pub views: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Validatable for Model {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.board_id.is_nil() {
            errors.add(ValidationError::new("board_id", "Board", "Pick a board"));
        }
        if self.state == PostState::Published && self.content.chars().count() < 20 {
            errors.add(ValidationError::new(
                "content",
                "Content",
                "Published posts need at least 20 characters",
            ));
        }
        errors.result()
    }
}

impl EntityResource for Model {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "post";
    const RESOURCE_NAME_PLURAL: &'static str = "posts";

    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Post")
            .display_name("Posts")
            .property(
                PropertyMetadata::new("title", CustomDataType::Text)
                    .name("Title")
                    .required()
                    .max_length(120)
                    .searchable()
                    .order(1),
            )
            .property(
                PropertyMetadata::new("board_id", CustomDataType::Entity)
                    .name("Board")
                    .required()
                    .hide_on_view()
                    .order(2),
            )
            .property(
                PropertyMetadata::new("content", CustomDataType::Html)
                    .name("Content")
                    .hide_on_view()
                    .searchable()
                    .order(3),
            )
            .property(
                PropertyMetadata::new("author", CustomDataType::Text)
                    .name("Author")
                    .read_only()
                    .order(4),
            )
            .property(
                PropertyMetadata::new("state", CustomDataType::Enum)
                    .name("State")
                    .enumeration::<PostState>()
                    .order(5),
            )
            .property(
                PropertyMetadata::new("published_at", CustomDataType::DateTime)
                    .name("Published")
                    .read_only()
                    .order(6),
            )
            .property(
                PropertyMetadata::new("views", CustomDataType::Integer)
                    .name("Views")
                    .read_only()
                    .hide_on_edit()
                    .order(7),
            )
            .display_property("title")
            .build()
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("title", Column::Title),
            ("published_at", Column::PublishedAt),
            ("views", Column::Views),
        ]
    }

    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("title", Column::Title), ("content", Column::Content)]
    }

    fn default_order() -> (Self::ColumnType, sea_orm::Order) {
        (Column::PublishedAt, sea_orm::Order::Desc)
    }
}

/// Stamps the author and publication time, and hides drafts from anonymous readers
pub struct PostService;

#[async_trait]
impl EntityDomainService for PostService {
    type Entity = Model;

    fn query(&self, ctx: &DomainContext) -> Select<Entity> {
        if ctx.authentication.is_authenticated() {
            Entity::find()
        } else {
            Entity::find().filter(Column::State.eq(PostState::Published))
        }
    }

    async fn before_update(
        &self,
        ctx: &DomainContext,
        item: &mut Model,
        is_new: bool,
    ) -> Result<(), ApiError> {
        if is_new {
            item.author = ctx
                .authentication
                .user
                .clone()
                .unwrap_or_else(|| "anonymous".to_string());
        }
        if item.state == PostState::Published && item.published_at.is_none() {
            item.published_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn after_remove(&self, _ctx: &DomainContext, id: Uuid) -> Result<(), ApiError> {
        tracing::info!(%id, "Post removed");
        Ok(())
    }
}
