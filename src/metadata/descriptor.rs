use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::EntityMetadata;
use crate::core::EntityResource;

type MetadataCache = RwLock<HashMap<TypeId, Arc<EntityMetadata>>>;

fn cache() -> &'static MetadataCache {
    static CACHE: OnceLock<MetadataCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Process-wide registry of entity metadata
///
/// `T::describe()` runs at most once per successful insert; concurrent first
/// lookups may both build, and the first stored value wins.
pub struct EntityDescriptor;

impl EntityDescriptor {
    #[must_use]
    pub fn metadata<T: EntityResource>() -> Arc<EntityMetadata> {
        let type_id = TypeId::of::<T>();
        if let Some(metadata) = cache()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Arc::clone(metadata);
        }

        let built = Arc::new(T::describe());
        tracing::debug!(
            entity = %built.name,
            properties = built.properties.len(),
            "Registered entity metadata"
        );
        let mut cache = cache().write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(type_id).or_insert(built))
    }
}
