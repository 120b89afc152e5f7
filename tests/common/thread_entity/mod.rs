use async_trait::async_trait;
use crudmvc::{
    ApiError, CustomDataType, DomainContext, EntityAuthentication, EntityDomainService,
    EntityMetadata, EntityResource, EnumDisplay, PropertyMetadata, Validatable, ValidationError,
    ValidationErrors, ViewButton,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

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
pub enum ThreadStatus {
    #[default]
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl EnumDisplay for ThreadStatus {
    fn display_name(&self) -> String {
        match self {
            Self::Open => "Open for replies".to_string(),
            Self::Closed => "Closed".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "threads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub pinned: bool,
    pub status: ThreadStatus,
    pub replies: i32,
    pub secret: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Validatable for Model {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.pinned && self.status == ThreadStatus::Closed {
            return Err(ValidationError::new(
                "pinned",
                "Pinned",
                "A closed thread cannot be pinned",
            )
            .into());
        }
        Ok(())
    }
}

impl EntityResource for Model {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "thread";
    const RESOURCE_NAME_PLURAL: &'static str = "threads";

    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Thread")
            .display_name("Threads")
            .property(PropertyMetadata::new("id", CustomDataType::Text).key())
            .property(
                PropertyMetadata::new("title", CustomDataType::Text)
                    .name("Title")
                    .required()
                    .max_length(40)
                    .searchable()
                    .order(1),
            )
            .property(
                PropertyMetadata::new("body", CustomDataType::MultilineText)
                    .name("Body")
                    .hide_on_view()
                    .searchable()
                    .order(2),
            )
            .property(
                PropertyMetadata::new("pinned", CustomDataType::Boolean)
                    .name("Pinned")
                    .order(3),
            )
            .property(
                PropertyMetadata::new("status", CustomDataType::Enum)
                    .name("Status")
                    .enumeration::<ThreadStatus>()
                    .order(4),
            )
            .property(
                PropertyMetadata::new("replies", CustomDataType::Integer)
                    .name("Replies")
                    .read_only()
                    .order(5),
            )
            .property(
                PropertyMetadata::new("secret", CustomDataType::Text)
                    .name("Moderator note")
                    .view_roles(["moderator"])
                    .order(6),
            )
            .display_property("title")
            .build()
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("title", Column::Title),
            ("replies", Column::Replies),
        ]
    }

    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("title", Column::Title), ("body", Column::Body)]
    }

    fn default_order() -> (Self::ColumnType, sea_orm::Order) {
        (Column::Title, sea_orm::Order::Asc)
    }
}

/// Threads only signed-in users may see, and only moderators may remove
pub struct ModeratedThreadService;

#[async_trait]
impl EntityDomainService for ModeratedThreadService {
    type Entity = Model;

    fn metadata(&self) -> Arc<EntityMetadata> {
        let mut metadata = Model::describe();
        metadata.authentication = EntityAuthentication::authenticated().remove_roles(["moderator"]);
        Arc::new(metadata)
    }

    fn view_buttons(&self, ctx: &DomainContext) -> Vec<ViewButton> {
        let mut buttons = vec![ViewButton::new("export", "Export", "export?format=csv")];
        if ctx.authentication.is_in_role("moderator") {
            buttons.push(ViewButton::new("history", "History", "/audit/history").per_item());
        }
        buttons
    }

    async fn before_update(
        &self,
        _ctx: &DomainContext,
        item: &mut Model,
        _is_new: bool,
    ) -> Result<(), ApiError> {
        if item.title.to_ascii_lowercase().contains("spam") {
            return Err(ApiError::bad_request("Spam is not allowed"));
        }
        item.title = item.title.trim().to_string();
        Ok(())
    }
}
