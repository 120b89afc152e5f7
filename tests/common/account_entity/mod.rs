use crudmvc::{CustomDataType, EntityMetadata, EntityResource, PropertyMetadata, Validatable};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Validatable for Model {}

impl EntityResource for Model {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "account";
    const RESOURCE_NAME_PLURAL: &'static str = "accounts";

    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Account")
            .display_name("Accounts")
            .property(
                PropertyMetadata::new("name", CustomDataType::Text)
                    .name("Name")
                    .required(),
            )
            .property(
                PropertyMetadata::new("password", CustomDataType::Password)
                    .name("Password")
                    .required()
                    .hide_on_view(),
            )
            .display_property("name")
            .build()
    }

    fn id(&self) -> Uuid {
        self.id
    }
}
