//! # Entity Domain Services
//!
//! The business operations behind every controller action. A service is bound
//! to one [`EntityResource`] and works over a [`DomainContext`] holding the
//! database connection, the caller and the request values.
//!
//! [`EntityDomainService`] has a default for every operation, so most entities
//! use [`DefaultEntityDomainService`]. Custom services override hooks for side
//! effects or the base `query` for scoping:
//!
//! ```rust,ignore
//! use crudmvc::{ApiError, DomainContext, EntityDomainService};
//! use async_trait::async_trait;
//!
//! pub struct ThreadService;
//!
//! #[async_trait]
//! impl EntityDomainService for ThreadService {
//!     type Entity = thread::Model;
//!
//!     async fn before_update(
//!         &self,
//!         ctx: &DomainContext,
//!         item: &mut thread::Model,
//!         is_new: bool,
//!     ) -> Result<(), ApiError> {
//!         if is_new {
//!             item.author = ctx.authentication.user.clone().unwrap_or_default();
//!         }
//!         Ok(())
//!     }
//! }
//! ```

pub mod binding;
pub mod models;
pub mod sort;
pub mod values;

pub use binding::bind_values;
pub use models::{EntityEditModel, EntityUpdateModel, EntityViewModel, ViewButton};
pub use values::ValueProvider;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    IntoActiveModel, Iterable, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    sea_query::LikeExpr,
};
use serde_json::Value;
use uuid::Uuid;

use crate::config::ControllerOptions;
use crate::core::EntityResource;
use crate::errors::ApiError;
use crate::metadata::{EntityDescriptor, EntityMetadata};
use crate::security::{Authentication, EntityDomainAuthorizeOption, authorize};

/// Everything one domain operation may look at
#[derive(Debug, Clone)]
pub struct DomainContext {
    pub db: DatabaseConnection,
    pub authentication: Authentication,
    pub values: ValueProvider,
    pub options: Arc<ControllerOptions>,
}

impl DomainContext {
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        authentication: Authentication,
        values: ValueProvider,
        options: Arc<ControllerOptions>,
    ) -> Self {
        Self {
            db,
            authentication,
            values,
            options,
        }
    }
}

/// Operations behind the entity controller actions
///
/// Every operation authorizes the caller against the entity policy first.
/// Hooks run inside `update` and `remove`; the `perform_*` methods hold the
/// database writes.
#[async_trait]
pub trait EntityDomainService: Send + Sync + 'static {
    type Entity: EntityResource;

    fn metadata(&self) -> Arc<EntityMetadata> {
        EntityDescriptor::metadata::<Self::Entity>()
    }

    /// Base select for listing and loading; override to scope what callers can reach
    fn query(&self, _ctx: &DomainContext) -> Select<<Self::Entity as EntityResource>::EntityType> {
        <Self::Entity as EntityResource>::EntityType::find()
    }

    /// Buttons shown on list pages; targets are relative to the controller mount
    fn view_buttons(&self, _ctx: &DomainContext) -> Vec<ViewButton> {
        Vec::new()
    }

    /// Load one entity through `query`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the entity doesn't exist.
    async fn fetch_one(&self, ctx: &DomainContext, id: Uuid) -> Result<Self::Entity, ApiError> {
        self.query(ctx)
            .filter(<Self::Entity as EntityResource>::ID_COLUMN.eq(id))
            .one(&ctx.db)
            .await
            .map_err(ApiError::database)?
            .ok_or_else(|| {
                ApiError::not_found(
                    <Self::Entity as EntityResource>::RESOURCE_NAME_SINGULAR,
                    Some(id.to_string()),
                )
            })
    }

    /// Page, sort and search the entities
    async fn list(&self, ctx: &DomainContext) -> Result<EntityViewModel<Self::Entity>, ApiError> {
        let metadata = self.metadata();
        authorize(&metadata, &ctx.authentication, EntityDomainAuthorizeOption::View)?;

        let requested_page = ctx.values.get_parsed::<u64>("page").unwrap_or(1).max(1);
        let current_size = ctx.options.page_size(ctx.values.get_parsed("size"));
        let search = ctx
            .values
            .get_str("q")
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        let mut query = self.query(ctx);
        if let Some(text) = &search {
            let searchable: Vec<&str> = metadata
                .search_properties()
                .filter(|p| p.authorization.can_view(&ctx.authentication))
                .map(|p| p.clr_name.as_str())
                .collect();
            let columns: Vec<_> = <Self::Entity as EntityResource>::searchable_columns()
                .into_iter()
                .filter(|(name, _)| searchable.contains(name))
                .collect();
            if !columns.is_empty() {
                let pattern = format!("%{}%", escape_like_wildcards(text));
                let condition = columns
                    .into_iter()
                    .fold(Condition::any(), |condition, (_, column)| {
                        condition.add(column.like(LikeExpr::new(pattern.as_str()).escape('\\')))
                    });
                query = query.filter(condition);
            }
        }

        let total_count = query
            .clone()
            .count(&ctx.db)
            .await
            .map_err(ApiError::database)?;
        let total_page = total_count.div_ceil(current_size.max(1)).max(1);
        let current_page = requested_page.min(total_page);

        let (order_column, order_direction) = sort::parse_sorting(
            &ctx.values,
            &<Self::Entity as EntityResource>::sortable_columns(),
            <Self::Entity as EntityResource>::default_order(),
        );
        let items = query
            .order_by(order_column, order_direction)
            .offset((current_page - 1).saturating_mul(current_size))
            .limit(current_size)
            .all(&ctx.db)
            .await
            .map_err(ApiError::database)?;

        tracing::debug!(
            entity = %metadata.name,
            page = current_page,
            size = current_size,
            total = total_count,
            "Listed entities"
        );

        Ok(EntityViewModel {
            items,
            properties: metadata
                .visible_properties(EntityDomainAuthorizeOption::View, &ctx.authentication),
            metadata,
            current_page,
            current_size,
            total_count,
            page_size_options: ctx.options.page_size_options.clone(),
            search,
            sort: ctx.values.get_str("sort").filter(|s| !s.trim().is_empty()),
            order: ctx.values.get_str("order").filter(|s| !s.trim().is_empty()),
            buttons: self.view_buttons(ctx),
        })
    }

    /// A blank entity for the create form
    async fn create(&self, ctx: &DomainContext) -> Result<EntityEditModel<Self::Entity>, ApiError> {
        let metadata = self.metadata();
        authorize(&metadata, &ctx.authentication, EntityDomainAuthorizeOption::Create)?;
        let item = new_item::<Self::Entity>(&metadata)?;
        Ok(edit_model(metadata, item, EntityDomainAuthorizeOption::Create, ctx, true))
    }

    /// The entity named by `id` for the edit form
    async fn edit(&self, ctx: &DomainContext) -> Result<EntityEditModel<Self::Entity>, ApiError> {
        self.load(ctx, EntityDomainAuthorizeOption::Edit).await
    }

    /// The entity named by `id` for display
    async fn detail(&self, ctx: &DomainContext) -> Result<EntityEditModel<Self::Entity>, ApiError> {
        self.load(ctx, EntityDomainAuthorizeOption::Detail).await
    }

    /// Authorize, then load the entity named by the `id` request value
    async fn load(
        &self,
        ctx: &DomainContext,
        option: EntityDomainAuthorizeOption,
    ) -> Result<EntityEditModel<Self::Entity>, ApiError> {
        let metadata = self.metadata();
        authorize(&metadata, &ctx.authentication, option)?;
        let id = ctx
            .values
            .require_id(<Self::Entity as EntityResource>::RESOURCE_NAME_SINGULAR)?;
        let item = self.fetch_one(ctx, id).await?;
        Ok(edit_model(metadata, item, option, ctx, false))
    }

    /// Insert (no `id`) or update (with `id`) from the request values
    ///
    /// Binding and validation failures are returned in the model, not as errors.
    async fn update(&self, ctx: &DomainContext) -> Result<EntityUpdateModel<Self::Entity>, ApiError> {
        let metadata = self.metadata();
        let existing = match ctx.values.get_id()? {
            Some(id) => {
                authorize(&metadata, &ctx.authentication, EntityDomainAuthorizeOption::Edit)?;
                Some(self.fetch_one(ctx, id).await?)
            }
            None => {
                authorize(&metadata, &ctx.authentication, EntityDomainAuthorizeOption::Create)?;
                None
            }
        };
        let is_new = existing.is_none();
        let item = match existing {
            Some(item) => item,
            None => new_item::<Self::Entity>(&metadata)?,
        };

        let mut item = match bind_values(item, &metadata, &ctx.values, &ctx.authentication) {
            Ok(item) => item,
            Err(errors) => {
                tracing::debug!(entity = %metadata.name, errors = errors.len(), "Update rejected");
                return Ok(EntityUpdateModel::failure(errors, is_new));
            }
        };

        self.before_update(ctx, &mut item, is_new).await?;
        let mut saved = if is_new {
            self.perform_insert(ctx, item).await?
        } else {
            self.perform_update(ctx, item).await?
        };
        self.after_update(ctx, &mut saved, is_new).await?;

        tracing::debug!(entity = %metadata.name, id = %saved.id(), is_new, "Entity saved");
        Ok(EntityUpdateModel::success(saved, is_new))
    }

    /// Delete the entity named by `id`
    async fn remove(&self, ctx: &DomainContext) -> Result<(), ApiError> {
        let metadata = self.metadata();
        authorize(&metadata, &ctx.authentication, EntityDomainAuthorizeOption::Remove)?;
        let id = ctx
            .values
            .require_id(<Self::Entity as EntityResource>::RESOURCE_NAME_SINGULAR)?;
        let item = self.fetch_one(ctx, id).await?;

        self.before_remove(ctx, &item).await?;
        self.perform_delete(ctx, id).await?;
        self.after_remove(ctx, id).await?;

        tracing::debug!(entity = %metadata.name, %id, "Entity removed");
        Ok(())
    }

    /// Runs after binding and validation, before the write
    async fn before_update(
        &self,
        _ctx: &DomainContext,
        _item: &mut Self::Entity,
        _is_new: bool,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    /// Runs after the write with the stored entity
    async fn after_update(
        &self,
        _ctx: &DomainContext,
        _item: &mut Self::Entity,
        _is_new: bool,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn before_remove(&self, _ctx: &DomainContext, _item: &Self::Entity) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_remove(&self, _ctx: &DomainContext, _id: Uuid) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_insert(
        &self,
        ctx: &DomainContext,
        item: Self::Entity,
    ) -> Result<Self::Entity, ApiError> {
        let active = set_all::<Self::Entity>(item.into_active_model());
        active.insert(&ctx.db).await.map_err(ApiError::database)
    }

    async fn perform_update(
        &self,
        ctx: &DomainContext,
        item: Self::Entity,
    ) -> Result<Self::Entity, ApiError> {
        let active = set_all::<Self::Entity>(item.into_active_model());
        active.update(&ctx.db).await.map_err(ApiError::database)
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when no row was deleted.
    async fn perform_delete(&self, ctx: &DomainContext, id: Uuid) -> Result<(), ApiError> {
        let result = <Self::Entity as EntityResource>::EntityType::delete_many()
            .filter(<Self::Entity as EntityResource>::ID_COLUMN.eq(id))
            .exec(&ctx.db)
            .await
            .map_err(ApiError::database)?;
        match result.rows_affected {
            0 => Err(ApiError::not_found(
                <Self::Entity as EntityResource>::RESOURCE_NAME_SINGULAR,
                Some(id.to_string()),
            )),
            _ => Ok(()),
        }
    }
}

/// `T::default()` with a fresh key
///
/// # Errors
///
/// Returns `ApiError::Internal` when the entity does not round-trip through JSON.
pub fn new_item<T: EntityResource>(metadata: &EntityMetadata) -> Result<T, ApiError> {
    let mut value = serde_json::to_value(T::default())
        .map_err(|err| ApiError::internal("Failed to create a new item", Some(err.to_string())))?;
    if let Value::Object(map) = &mut value {
        map.insert(
            metadata.key.clone(),
            Value::String(Uuid::new_v4().to_string()),
        );
    }
    serde_json::from_value(value)
        .map_err(|err| ApiError::internal("Failed to create a new item", Some(err.to_string())))
}

fn edit_model<T>(
    metadata: Arc<EntityMetadata>,
    item: T,
    option: EntityDomainAuthorizeOption,
    ctx: &DomainContext,
    is_new: bool,
) -> EntityEditModel<T> {
    EntityEditModel {
        item,
        properties: metadata.visible_properties(option, &ctx.authentication),
        metadata,
        is_new,
    }
}

/// Escape `LIKE` wildcards so search text matches literally (`ESCAPE '\'`)
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Mark every column as set so the whole bound entity is written
fn set_all<T: EntityResource>(mut active: T::ActiveModelType) -> T::ActiveModelType {
    for column in <T::EntityType as EntityTrait>::Column::iter() {
        if let ActiveValue::Unchanged(value) = active.get(column) {
            active.set(column, value);
        }
    }
    active
}

/// The domain service used when an entity needs no custom behavior
pub struct DefaultEntityDomainService<T: EntityResource> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T: EntityResource> DefaultEntityDomainService<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: EntityResource> Default for DefaultEntityDomainService<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: EntityResource> EntityDomainService for DefaultEntityDomainService<T> {
    type Entity = T;
}
