//! # Entity Metadata
//!
//! Describes a domain type's properties and display rules so that controllers,
//! views and the JSON layer can work over any entity without knowing its
//! concrete fields. Metadata is declared once per entity with
//! [`EntityMetadata::builder`] and cached by [`EntityDescriptor`].
//!
//! ```rust,ignore
//! fn describe() -> EntityMetadata {
//!     EntityMetadata::builder("Thread")
//!         .display_name("Threads")
//!         .property(PropertyMetadata::new("title", CustomDataType::Text).name("Title").required().searchable())
//!         .property(PropertyMetadata::new("status", CustomDataType::Enum).enumeration::<ThreadStatus>())
//!         .display_property("title")
//!         .build()
//! }
//! ```

pub mod descriptor;
pub mod enums;

pub use descriptor::EntityDescriptor;
pub use enums::{EnumDisplay, EnumItem, analyze_enum};

use std::sync::Arc;

use crate::security::{
    Authentication, EntityAuthentication, EntityDomainAuthorizeOption, PropertyAuthorization,
};

/// Data type of a property; selects its editor and viewer templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomDataType {
    Text,
    MultilineText,
    Html,
    Password,
    EmailAddress,
    PhoneNumber,
    Url,
    ImageUrl,
    Boolean,
    Integer,
    Number,
    Currency,
    Date,
    DateTime,
    Time,
    Enum,
    /// Reference to another entity by its key
    Entity,
    /// Rendered by the templates named after `PropertyMetadata::custom_type`
    Other,
}

impl CustomDataType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::MultilineText => "MultilineText",
            Self::Html => "Html",
            Self::Password => "Password",
            Self::EmailAddress => "EmailAddress",
            Self::PhoneNumber => "PhoneNumber",
            Self::Url => "Url",
            Self::ImageUrl => "ImageUrl",
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Number => "Number",
            Self::Currency => "Currency",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Enum => "Enum",
            Self::Entity => "Entity",
            Self::Other => "Other",
        }
    }

    /// Types whose bound value is a string
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::MultilineText
                | Self::Html
                | Self::Password
                | Self::EmailAddress
                | Self::PhoneNumber
                | Self::Url
                | Self::ImageUrl
        )
    }
}

impl std::fmt::Display for CustomDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one entity property
#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    /// Field name in the serialized entity
    pub clr_name: String,
    /// Display name
    pub name: String,
    pub description: Option<String>,
    pub data_type: CustomDataType,
    /// Template prefix used when `data_type` is `Other`
    pub custom_type: Option<String>,
    pub is_required: bool,
    pub is_key: bool,
    pub is_read_only: bool,
    pub hide_on_view: bool,
    pub hide_on_edit: bool,
    pub hide_on_detail: bool,
    pub is_searchable: bool,
    pub max_length: Option<usize>,
    pub order: i32,
    pub enum_items: Option<Arc<[EnumItem]>>,
    pub authorization: PropertyAuthorization,
}

impl PropertyMetadata {
    #[must_use]
    pub fn new(clr_name: impl Into<String>, data_type: CustomDataType) -> Self {
        let clr_name = clr_name.into();
        Self {
            name: clr_name.clone(),
            clr_name,
            description: None,
            data_type,
            custom_type: None,
            is_required: false,
            is_key: false,
            is_read_only: false,
            hide_on_view: false,
            hide_on_edit: false,
            hide_on_detail: false,
            is_searchable: false,
            max_length: None,
            order: 0,
            enum_items: None,
            authorization: PropertyAuthorization::default(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Render this property with the `{custom_type}Editor` / `{custom_type}Viewer` templates
    #[must_use]
    pub fn custom_type(mut self, custom_type: impl Into<String>) -> Self {
        self.data_type = CustomDataType::Other;
        self.custom_type = Some(custom_type.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    #[must_use]
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self.is_read_only = true;
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    #[must_use]
    pub fn hide_on_view(mut self) -> Self {
        self.hide_on_view = true;
        self
    }

    #[must_use]
    pub fn hide_on_edit(mut self) -> Self {
        self.hide_on_edit = true;
        self
    }

    #[must_use]
    pub fn hide_on_detail(mut self) -> Self {
        self.hide_on_detail = true;
        self
    }

    #[must_use]
    pub fn searchable(mut self) -> Self {
        self.is_searchable = true;
        self
    }

    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Mark the property as an enum and attach the analyzed variants of `E`
    #[must_use]
    pub fn enumeration<E: EnumDisplay>(mut self) -> Self {
        self.data_type = CustomDataType::Enum;
        self.enum_items = Some(analyze_enum::<E>());
        self
    }

    /// Require authentication to see or edit this property
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.authorization.allow_anonymous = false;
        self
    }

    #[must_use]
    pub fn view_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorization.allow_anonymous = false;
        self.authorization.view_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn edit_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorization.edit_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Name of the template family rendering this property (`"Boolean"`, or the custom type)
    #[must_use]
    pub fn template_prefix(&self) -> &str {
        match (self.data_type, &self.custom_type) {
            (CustomDataType::Other, Some(custom)) => custom,
            (data_type, _) => data_type.as_str(),
        }
    }

    #[must_use]
    pub fn is_editable(&self) -> bool {
        !self.is_key && !self.is_read_only
    }
}

/// Metadata of an entity type
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    pub name: String,
    pub display_name: String,
    /// Field name of the key property
    pub key: String,
    /// Field name of the property used as the entity's text
    pub display_property: Option<String>,
    pub properties: Vec<PropertyMetadata>,
    pub authentication: EntityAuthentication,
}

impl EntityMetadata {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder::new(name)
    }

    /// Look up a property by field name, falling back to a case-insensitive
    /// match on field or display name
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties
            .iter()
            .find(|p| p.clr_name == name)
            .or_else(|| {
                self.properties.iter().find(|p| {
                    p.clr_name.eq_ignore_ascii_case(name) || p.name.eq_ignore_ascii_case(name)
                })
            })
    }

    #[must_use]
    pub fn key_property(&self) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.is_key)
    }

    pub fn view_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| !p.is_key && !p.hide_on_view)
    }

    pub fn edit_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| !p.is_key && !p.hide_on_edit)
    }

    pub fn detail_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| !p.is_key && !p.hide_on_detail)
    }

    pub fn search_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| p.is_searchable)
    }

    /// Properties shown for an action, in display order
    #[must_use]
    pub fn properties_for(&self, option: EntityDomainAuthorizeOption) -> Vec<&PropertyMetadata> {
        match option {
            EntityDomainAuthorizeOption::View | EntityDomainAuthorizeOption::Remove => {
                self.view_properties().collect()
            }
            EntityDomainAuthorizeOption::Create | EntityDomainAuthorizeOption::Edit => {
                self.edit_properties().collect()
            }
            EntityDomainAuthorizeOption::Detail => self.detail_properties().collect(),
        }
    }

    /// Properties shown for an action that the caller is allowed to see
    #[must_use]
    pub fn visible_properties(
        &self,
        option: EntityDomainAuthorizeOption,
        authentication: &Authentication,
    ) -> Vec<PropertyMetadata> {
        self.properties_for(option)
            .into_iter()
            .filter(|p| p.authorization.can_view(authentication))
            .cloned()
            .collect()
    }
}

/// Builder for [`EntityMetadata`]
#[derive(Debug)]
pub struct EntityMetadataBuilder {
    name: String,
    display_name: Option<String>,
    display_property: Option<String>,
    properties: Vec<PropertyMetadata>,
    authentication: EntityAuthentication,
}

impl EntityMetadataBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            display_property: None,
            properties: Vec::new(),
            authentication: EntityAuthentication::default(),
        }
    }

    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn display_property(mut self, clr_name: impl Into<String>) -> Self {
        self.display_property = Some(clr_name.into());
        self
    }

    #[must_use]
    pub fn property(mut self, property: PropertyMetadata) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn authentication(mut self, authentication: EntityAuthentication) -> Self {
        self.authentication = authentication;
        self
    }

    /// Finish the metadata.
    ///
    /// Properties are sorted by `order` (stable). When no property is marked as
    /// key, a property named `id` becomes the key, or a hidden `id` key is added.
    #[must_use]
    pub fn build(mut self) -> EntityMetadata {
        if !self.properties.iter().any(|p| p.is_key) {
            match self.properties.iter_mut().find(|p| p.clr_name == "id") {
                Some(id) => {
                    id.is_key = true;
                    id.is_read_only = true;
                }
                None => self
                    .properties
                    .insert(0, PropertyMetadata::new("id", CustomDataType::Text).key()),
            }
        }
        self.properties.sort_by_key(|p| p.order);

        let key = self
            .properties
            .iter()
            .find(|p| p.is_key)
            .map_or_else(|| "id".to_string(), |p| p.clr_name.clone());

        EntityMetadata {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            key,
            display_property: self.display_property,
            properties: self.properties,
            authentication: self.authentication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_metadata() -> EntityMetadata {
        EntityMetadata::builder("Thread")
            .display_name("Threads")
            .property(PropertyMetadata::new("id", CustomDataType::Text))
            .property(
                PropertyMetadata::new("title", CustomDataType::Text)
                    .name("Title")
                    .required()
                    .searchable()
                    .order(1),
            )
            .property(
                PropertyMetadata::new("body", CustomDataType::MultilineText)
                    .name("Body")
                    .hide_on_view()
                    .order(2),
            )
            .property(
                PropertyMetadata::new("notes", CustomDataType::Text)
                    .view_roles(["moderator"])
                    .hide_on_edit()
                    .order(3),
            )
            .display_property("title")
            .build()
    }

    #[test]
    fn test_id_property_becomes_key() {
        let metadata = thread_metadata();
        assert_eq!(metadata.key, "id");
        assert!(metadata.key_property().unwrap().is_read_only);
    }

    #[test]
    fn test_missing_key_is_added() {
        let metadata = EntityMetadata::builder("Tag")
            .property(PropertyMetadata::new("label", CustomDataType::Text))
            .build();
        assert_eq!(metadata.key, "id");
        assert_eq!(metadata.properties.len(), 2);
        assert!(metadata.properties.iter().any(|p| p.is_key));
    }

    #[test]
    fn test_get_property_falls_back_to_case_insensitive() {
        let metadata = thread_metadata();
        assert_eq!(metadata.get_property("title").unwrap().name, "Title");
        assert_eq!(metadata.get_property("TITLE").unwrap().clr_name, "title");
        assert_eq!(metadata.get_property("Body").unwrap().clr_name, "body");
        assert!(metadata.get_property("missing").is_none());
    }

    #[test]
    fn test_properties_for_each_action() {
        let metadata = thread_metadata();
        let names = |option| {
            metadata
                .properties_for(option)
                .iter()
                .map(|p| p.clr_name.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(names(EntityDomainAuthorizeOption::View), ["title", "notes"]);
        assert_eq!(names(EntityDomainAuthorizeOption::Edit), ["title", "body"]);
        assert_eq!(
            names(EntityDomainAuthorizeOption::Detail),
            ["title", "body", "notes"]
        );
    }

    #[test]
    fn test_visible_properties_respect_property_roles() {
        let metadata = thread_metadata();
        let anonymous = Authentication::anonymous();
        let moderator = Authentication::user("ann", ["moderator"]);

        let visible = metadata.visible_properties(EntityDomainAuthorizeOption::View, &anonymous);
        assert_eq!(visible.len(), 1);

        let visible = metadata.visible_properties(EntityDomainAuthorizeOption::View, &moderator);
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_template_prefix() {
        let boolean = PropertyMetadata::new("done", CustomDataType::Boolean);
        assert_eq!(boolean.template_prefix(), "Boolean");

        let custom = PropertyMetadata::new("color", CustomDataType::Text).custom_type("Color");
        assert_eq!(custom.data_type, CustomDataType::Other);
        assert_eq!(custom.template_prefix(), "Color");
    }
}
