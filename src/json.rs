//! Metadata-driven JSON for the controller's JSON responses
//!
//! Entities are written with only their key and the properties the caller may
//! see for the action. Metadata and view models use PascalCase keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::domain::{EntityEditModel, EntityViewModel};
use crate::metadata::{EntityMetadata, EnumItem, PropertyMetadata};
use crate::security::{Authentication, EntityDomainAuthorizeOption};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyMetadataJson {
    pub clr_name: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "Type")]
    pub data_type: String,
    pub custom_type: Option<String>,
    pub is_required: bool,
    pub is_key: bool,
    pub is_read_only: bool,
    pub max_length: Option<usize>,
    pub order: i32,
    pub enum_items: Option<Vec<EnumItem>>,
}

impl From<&PropertyMetadata> for PropertyMetadataJson {
    fn from(property: &PropertyMetadata) -> Self {
        Self {
            clr_name: property.clr_name.clone(),
            name: property.name.clone(),
            description: property.description.clone(),
            data_type: property.data_type.as_str().to_string(),
            custom_type: property.custom_type.clone(),
            is_required: property.is_required,
            is_key: property.is_key,
            is_read_only: property.is_read_only,
            max_length: property.max_length,
            order: property.order,
            enum_items: property.enum_items.as_deref().map(<[EnumItem]>::to_vec),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct EntityMetadataJson {
    pub name: String,
    pub display_name: String,
    pub key: String,
    pub display_property: Option<String>,
    pub properties: Vec<PropertyMetadataJson>,
}

impl EntityMetadataJson {
    /// Metadata listing only the properties in `properties`
    #[must_use]
    pub fn new(metadata: &EntityMetadata, properties: &[PropertyMetadata]) -> Self {
        Self {
            name: metadata.name.clone(),
            display_name: metadata.display_name.clone(),
            key: metadata.key.clone(),
            display_property: metadata.display_property.clone(),
            properties: properties.iter().map(PropertyMetadataJson::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct EntityViewModelJson {
    pub metadata: EntityMetadataJson,
    pub properties: Vec<PropertyMetadataJson>,
    pub items: Vec<Value>,
    pub current_page: u64,
    pub current_size: u64,
    pub total_page: u64,
    pub total_count: u64,
    pub page_size_option: Vec<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct EntityEditModelJson {
    pub metadata: EntityMetadataJson,
    pub properties: Vec<PropertyMetadataJson>,
    pub item: Value,
    pub is_new: bool,
}

/// The entity's key and the properties visible for `option`
#[must_use]
pub fn entity_to_json<T: Serialize>(
    item: &T,
    metadata: &EntityMetadata,
    option: EntityDomainAuthorizeOption,
    authentication: &Authentication,
) -> Value {
    let properties = metadata.visible_properties(option, authentication);
    select_properties(item, metadata, &properties)
}

fn select_properties<T: Serialize>(
    item: &T,
    metadata: &EntityMetadata,
    properties: &[PropertyMetadata],
) -> Value {
    let Ok(Value::Object(mut source)) = serde_json::to_value(item) else {
        tracing::warn!(entity = %metadata.name, "Entity did not serialize to an object");
        return Value::Object(Map::new());
    };

    let mut object = Map::new();
    if let Some(key) = source.remove(&metadata.key) {
        object.insert(metadata.key.clone(), key);
    }
    for property in properties {
        if let Some(value) = source.remove(&property.clr_name) {
            object.insert(property.clr_name.clone(), value);
        }
    }
    Value::Object(object)
}

/// JSON for the list actions; items carry the view model's visible properties
#[must_use]
pub fn view_model_to_json<T: Serialize>(model: &EntityViewModel<T>) -> EntityViewModelJson {
    let properties: Vec<PropertyMetadataJson> =
        model.properties.iter().map(PropertyMetadataJson::from).collect();
    EntityViewModelJson {
        metadata: EntityMetadataJson::new(&model.metadata, &model.properties),
        items: model
            .items
            .iter()
            .map(|item| select_properties(item, &model.metadata, &model.properties))
            .collect(),
        properties,
        current_page: model.current_page,
        current_size: model.current_size,
        total_page: model.total_page(),
        total_count: model.total_count,
        page_size_option: model.page_size_options.clone(),
        search: model.search.clone(),
    }
}

/// JSON for the create, edit and detail actions
#[must_use]
pub fn edit_model_to_json<T: Serialize>(model: &EntityEditModel<T>) -> EntityEditModelJson {
    EntityEditModelJson {
        metadata: EntityMetadataJson::new(&model.metadata, &model.properties),
        properties: model.properties.iter().map(PropertyMetadataJson::from).collect(),
        item: select_properties(&model.item, &model.metadata, &model.properties),
        is_new: model.is_new,
    }
}
