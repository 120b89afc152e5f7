use crudmvc::validation::validators::validate_range;
use crudmvc::{
    CustomDataType, EntityAuthentication, EntityDescriptor, EntityMetadata, EntityResource,
    PropertyMetadata, Validatable, ValidationErrors,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "boards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub contact: Option<String>,
    pub homepage: Option<String>,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Validatable for Model {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let metadata = EntityDescriptor::metadata::<Self>();
        if let Some(property) = metadata.get_property("sort_order") {
            validate_range(property, self.sort_order, Some(0), Some(1000))?;
        }
        Ok(())
    }
}

impl EntityResource for Model {
    type EntityType = Entity;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "board";
    const RESOURCE_NAME_PLURAL: &'static str = "boards";

    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Board")
            .display_name("Boards")
            .property(
                PropertyMetadata::new("name", CustomDataType::Text)
                    .name("Name")
                    .required()
                    .max_length(60)
                    .searchable(),
            )
            .property(
                PropertyMetadata::new("description", CustomDataType::MultilineText)
                    .name("Description")
                    .hide_on_view(),
            )
            .property(
                PropertyMetadata::new("contact", CustomDataType::EmailAddress)
                    .name("Contact")
                    .description("Moderator mailbox"),
            )
            .property(PropertyMetadata::new("homepage", CustomDataType::Url).name("Homepage"))
            .property(
                PropertyMetadata::new("sort_order", CustomDataType::Integer)
                    .name("Sort order")
                    .edit_roles(["admin"]),
            )
            .display_property("name")
            .authentication(EntityAuthentication::default().remove_roles(["admin"]))
            .build()
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("name", Column::Name), ("sort_order", Column::SortOrder)]
    }

    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("name", Column::Name)]
    }

    fn default_order() -> (Self::ColumnType, sea_orm::Order) {
        (Column::SortOrder, sea_orm::Order::Asc)
    }
}
