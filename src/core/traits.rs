use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult,
    IntoActiveModel, Order,
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::metadata::EntityMetadata;
use crate::validation::Validatable;

/// A `SeaORM` model served by an entity controller
///
/// The model itself is the entity: it is serialized for views and JSON, and
/// rebuilt from JSON when request values are bound onto it. Its key is a UUID.
///
/// ```rust,ignore
/// impl EntityResource for Model {
///     type EntityType = Entity;
///     type ColumnType = Column;
///     type ActiveModelType = ActiveModel;
///
///     const ID_COLUMN: Column = Column::Id;
///     const RESOURCE_NAME_SINGULAR: &'static str = "thread";
///     const RESOURCE_NAME_PLURAL: &'static str = "threads";
///
///     fn describe() -> EntityMetadata { /* ... */ }
///     fn id(&self) -> Uuid { self.id }
/// }
/// ```
pub trait EntityResource:
    Serialize
    + DeserializeOwned
    + FromQueryResult
    + Default
    + Clone
    + Send
    + Sync
    + Validatable
    + 'static
where
    Self: IntoActiveModel<<Self as EntityResource>::ActiveModelType>,
{
    type EntityType: EntityTrait<Model = Self> + Sync;
    type ColumnType: ColumnTrait + Copy + std::fmt::Debug;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType>
        + ActiveModelBehavior
        + Send
        + Sync;

    const ID_COLUMN: Self::ColumnType;
    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;

    /// Describe the entity's properties; called once, see `EntityDescriptor`
    fn describe() -> EntityMetadata;

    fn id(&self) -> Uuid;

    /// Columns accepted by the `sort` request value
    #[must_use]
    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("id", Self::ID_COLUMN)]
    }

    /// Columns matched (substring) by the `q` request value
    ///
    /// Only columns whose property is searchable and visible to the caller are used.
    #[must_use]
    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![]
    }

    /// Ordering used when the request names no sortable column
    #[must_use]
    fn default_order() -> (Self::ColumnType, Order) {
        (Self::ID_COLUMN, Order::Asc)
    }
}
