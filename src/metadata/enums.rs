use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One selectable variant of an enum property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnumItem {
    /// Display name
    #[serde(rename = "Name")]
    pub name: String,
    /// Serialized value, as it appears in the entity JSON
    #[serde(rename = "Value")]
    pub value: serde_json::Value,
}

impl EnumItem {
    /// The value as form text (`"open"`, `"3"`)
    #[must_use]
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Enums usable as `CustomDataType::Enum` properties
///
/// Derive `EnumIter` (re-exported by `sea_orm`) and `Serialize` on the enum;
/// override `display_name` to label variants.
pub trait EnumDisplay: Iterable + Serialize + fmt::Debug + 'static {
    fn display_name(&self) -> String {
        format!("{self:?}")
    }
}

type EnumCache = RwLock<HashMap<TypeId, Arc<[EnumItem]>>>;

fn cache() -> &'static EnumCache {
    static CACHE: OnceLock<EnumCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Enumerate the variants of `E` as display name / value pairs, cached per type
#[must_use]
pub fn analyze_enum<E: EnumDisplay>() -> Arc<[EnumItem]> {
    let type_id = TypeId::of::<E>();
    if let Some(items) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
    {
        return Arc::clone(items);
    }

    let items: Arc<[EnumItem]> = E::iter()
        .map(|variant| EnumItem {
            name: variant.display_name(),
            value: serde_json::to_value(&variant).unwrap_or_else(|err| {
                tracing::warn!(variant = ?variant, error = %err, "Enum variant is not serializable");
                serde_json::Value::Null
            }),
        })
        .collect();

    let mut cache = cache().write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(cache.entry(type_id).or_insert(items))
}
