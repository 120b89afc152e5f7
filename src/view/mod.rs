//! # Server-Rendered Views
//!
//! [`ViewEngine`] renders the controller pages with handlebars. The built-in
//! templates live in `templates/` and are compiled into the crate; a template
//! directory (`ControllerOptions::templates_dir`) overrides any of them by file
//! stem, so `Index.hbs` replaces the list page and `ColorEditor.hbs` adds an
//! editor for properties with the custom type `Color`.
//!
//! Pages receive their properties pre-rendered (`Cells`, `Fields`) and can also
//! call the `editor` / `viewer` helpers themselves.

pub mod helpers;

pub use helpers::{EditorModel, PartialKind};

use std::fs;
use std::path::Path;

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Value, json};
use url::form_urlencoded;

use crate::config::ControllerOptions;
use crate::domain::{EntityEditModel, EntityViewModel, ViewButton};
use crate::errors::ApiError;
use crate::json::{EntityMetadataJson, PropertyMetadataJson};
use crate::metadata::{EntityMetadata, PropertyMetadata};

pub const INDEX_VIEW: &str = "Index";
pub const EDIT_VIEW: &str = "Edit";
pub const DETAIL_VIEW: &str = "Detail";
pub const SELECTOR_VIEW: &str = "Selector";
pub const MULTIPLE_SELECTOR_VIEW: &str = "MultipleSelector";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (INDEX_VIEW, include_str!("../../templates/Index.hbs")),
    (EDIT_VIEW, include_str!("../../templates/Edit.hbs")),
    (DETAIL_VIEW, include_str!("../../templates/Detail.hbs")),
    (SELECTOR_VIEW, include_str!("../../templates/Selector.hbs")),
    (MULTIPLE_SELECTOR_VIEW, include_str!("../../templates/MultipleSelector.hbs")),
    (helpers::DEFAULT_EDITOR, include_str!("../../templates/DefaultEditor.hbs")),
    (helpers::DEFAULT_VIEWER, include_str!("../../templates/DefaultViewer.hbs")),
    ("MultilineTextEditor", include_str!("../../templates/MultilineTextEditor.hbs")),
    ("HtmlEditor", include_str!("../../templates/MultilineTextEditor.hbs")),
    ("HtmlViewer", include_str!("../../templates/HtmlViewer.hbs")),
    ("PasswordEditor", include_str!("../../templates/PasswordEditor.hbs")),
    ("PasswordViewer", include_str!("../../templates/PasswordViewer.hbs")),
    ("EmailAddressEditor", include_str!("../../templates/EmailAddressEditor.hbs")),
    ("EmailAddressViewer", include_str!("../../templates/EmailAddressViewer.hbs")),
    ("UrlEditor", include_str!("../../templates/UrlEditor.hbs")),
    ("UrlViewer", include_str!("../../templates/UrlViewer.hbs")),
    ("ImageUrlViewer", include_str!("../../templates/ImageUrlViewer.hbs")),
    ("BooleanEditor", include_str!("../../templates/BooleanEditor.hbs")),
    ("IntegerEditor", include_str!("../../templates/NumberEditor.hbs")),
    ("NumberEditor", include_str!("../../templates/NumberEditor.hbs")),
    ("CurrencyEditor", include_str!("../../templates/NumberEditor.hbs")),
    ("DateEditor", include_str!("../../templates/DateEditor.hbs")),
    ("DateTimeEditor", include_str!("../../templates/DateTimeEditor.hbs")),
    ("TimeEditor", include_str!("../../templates/TimeEditor.hbs")),
    ("EnumEditor", include_str!("../../templates/EnumEditor.hbs")),
];

/// Handlebars registry holding the page templates and property partials
#[derive(Debug)]
pub struct ViewEngine {
    handlebars: Handlebars<'static>,
}

impl ViewEngine {
    /// The built-in templates only
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Template` if a built-in template fails to compile.
    pub fn new() -> Result<Self, ApiError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_helper("editor", Box::new(helpers::editor_helper));
        handlebars.register_helper("viewer", Box::new(helpers::viewer_helper));

        let mut engine = Self { handlebars };
        for (name, source) in BUILTIN_TEMPLATES {
            engine.register_template(name, source)?;
        }
        Ok(engine)
    }

    /// Built-in templates overridden by the configured template directory
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Template` when a template fails to compile and
    /// `ApiError::Internal` when the directory cannot be read.
    pub fn from_options(options: &ControllerOptions) -> Result<Self, ApiError> {
        let mut engine = Self::new()?;
        if let Some(dir) = &options.templates_dir {
            engine.load_directory(dir)?;
        }
        Ok(engine)
    }

    /// Register every `*.hbs` file of `dir` under its file stem
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be read or a template fails to compile.
    pub fn load_directory(&mut self, dir: &Path) -> Result<usize, ApiError> {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "Template directory does not exist");
            return Ok(0);
        }

        let read_error = |err: std::io::Error| {
            ApiError::internal("Failed to load templates", Some(format!("{}: {err}", dir.display())))
        };
        let mut loaded = 0;
        for entry in fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "hbs") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path).map_err(read_error)?;
            self.register_template(name, &source)?;
            tracing::debug!(template = name, "Loaded template override");
            loaded += 1;
        }
        Ok(loaded)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Template` if the source fails to compile.
    pub fn register_template(&mut self, name: &str, source: &str) -> Result<(), ApiError> {
        self.handlebars
            .register_template_string(name, source)
            .map_err(|err| ApiError::template(name, err))
    }

    #[must_use]
    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Template` if rendering fails.
    pub fn render<D: Serialize>(&self, name: &str, data: &D) -> Result<String, ApiError> {
        Ok(self.handlebars.render(name, data)?)
    }

    /// Render the editor of `property` with the entity's current value
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Template` if rendering fails.
    pub fn editor<T: Serialize>(&self, entity: &T, property: &PropertyMetadata) -> Result<String, ApiError> {
        let entity = entity_json(entity)?;
        let value = entity.get(&property.clr_name).cloned().unwrap_or(Value::Null);
        self.render_property(PartialKind::Editor, property, value, entity)
    }

    /// Render the editor of `property` with an explicit value
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Template` if rendering fails.
    pub fn editor_with_value<T: Serialize>(
        &self,
        entity: &T,
        property: &PropertyMetadata,
        value: Value,
    ) -> Result<String, ApiError> {
        self.render_property(PartialKind::Editor, property, value, entity_json(entity)?)
    }

    /// Render the editor of the property named `property_name`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` when the entity has no such property.
    pub fn editor_for<T: Serialize>(
        &self,
        entity: &T,
        metadata: &EntityMetadata,
        property_name: &str,
    ) -> Result<String, ApiError> {
        self.editor(entity, find_property(metadata, property_name)?)
    }

    /// Render the viewer of `property` with the entity's current value
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Template` if rendering fails.
    pub fn viewer<T: Serialize>(&self, entity: &T, property: &PropertyMetadata) -> Result<String, ApiError> {
        let entity = entity_json(entity)?;
        let value = entity.get(&property.clr_name).cloned().unwrap_or(Value::Null);
        self.render_property(PartialKind::Viewer, property, value, entity)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Template` if rendering fails.
    pub fn viewer_with_value<T: Serialize>(
        &self,
        entity: &T,
        property: &PropertyMetadata,
        value: Value,
    ) -> Result<String, ApiError> {
        self.render_property(PartialKind::Viewer, property, value, entity_json(entity)?)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Internal` when the entity has no such property.
    pub fn viewer_for<T: Serialize>(
        &self,
        entity: &T,
        metadata: &EntityMetadata,
        property_name: &str,
    ) -> Result<String, ApiError> {
        self.viewer(entity, find_property(metadata, property_name)?)
    }

    fn render_property(
        &self,
        kind: PartialKind,
        property: &PropertyMetadata,
        value: Value,
        entity: Value,
    ) -> Result<String, ApiError> {
        let model = EditorModel::new(PropertyMetadataJson::from(property), value, entity);
        Ok(model.render(&self.handlebars, kind)?)
    }

    /// Render a list page (`Index`, `Selector` or `MultipleSelector`)
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Template` if rendering fails.
    pub fn render_list<T: Serialize>(
        &self,
        view: &str,
        model: &EntityViewModel<T>,
        base_path: &str,
    ) -> Result<String, ApiError> {
        let metadata = &model.metadata;
        let mut rows = Vec::with_capacity(model.items.len());
        for item in &model.items {
            let entity = entity_json(item)?;
            let cells = model
                .properties
                .iter()
                .map(|property| {
                    let value = entity.get(&property.clr_name).cloned().unwrap_or(Value::Null);
                    self.render_property(PartialKind::Viewer, property, value, entity.clone())
                })
                .collect::<Result<Vec<_>, _>>()?;
            let key = entity.get(&metadata.key).cloned().unwrap_or(Value::Null);
            let key_text = match &key {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            let buttons = model
                .buttons
                .iter()
                .filter(|button| button.per_item)
                .map(|button| button_json(button, button.item_target(&key_text)))
                .collect::<Vec<_>>();
            rows.push(json!({
                "Key": key,
                "Buttons": buttons,
                "Text": display_text(metadata, &entity),
                "Cells": cells,
                "Item": entity,
            }));
        }

        let total_page = model.total_page();
        let data = json!({
            "BasePath": base_path,
            "Metadata": EntityMetadataJson::new(metadata, &model.properties),
            "Properties": model.properties.iter().map(PropertyMetadataJson::from).collect::<Vec<_>>(),
            "Rows": rows,
            "CurrentPage": model.current_page,
            "CurrentSize": model.current_size,
            "TotalPage": total_page,
            "TotalCount": model.total_count,
            "PageSizeOption": model.page_size_options,
            "Search": model.search,
            "PageQuery": page_query(model),
            "Buttons": model
                .buttons
                .iter()
                .filter(|button| !button.per_item)
                .map(|button| button_json(button, button.target.clone()))
                .collect::<Vec<_>>(),
            "HasPrevious": model.current_page > 1,
            "PreviousPage": model.current_page.saturating_sub(1).max(1),
            "HasNext": model.current_page < total_page,
            "NextPage": model.current_page + 1,
        });
        self.render(view, &data)
    }

    /// Render the `Edit` page (also used by create) or the `Detail` page
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Template` if rendering fails.
    pub fn render_item<T: Serialize>(
        &self,
        view: &str,
        kind: PartialKind,
        model: &EntityEditModel<T>,
        base_path: &str,
    ) -> Result<String, ApiError> {
        let metadata = &model.metadata;
        let entity = entity_json(&model.item)?;
        let fields = model
            .properties
            .iter()
            .map(|property| {
                let value = entity.get(&property.clr_name).cloned().unwrap_or(Value::Null);
                let html = self.render_property(kind, property, value, entity.clone())?;
                Ok(json!({
                    "ClrName": property.clr_name,
                    "Name": property.name,
                    "Description": property.description,
                    "IsRequired": property.is_required,
                    "Html": html,
                }))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        let data = json!({
            "BasePath": base_path,
            "Metadata": EntityMetadataJson::new(metadata, &model.properties),
            "Key": entity.get(&metadata.key).cloned().unwrap_or(Value::Null),
            "Text": display_text(metadata, &entity),
            "IsNew": model.is_new,
            "Fields": fields,
            "Item": entity,
        });
        self.render(view, &data)
    }
}

fn entity_json<T: Serialize>(entity: &T) -> Result<Value, ApiError> {
    serde_json::to_value(entity)
        .map_err(|err| ApiError::internal("Failed to serialize entity", Some(err.to_string())))
}

fn find_property<'a>(metadata: &'a EntityMetadata, name: &str) -> Result<&'a PropertyMetadata, ApiError> {
    metadata.get_property(name).ok_or_else(|| {
        ApiError::internal(
            "Unknown property",
            Some(format!("{} has no property named '{name}'", metadata.name)),
        )
    })
}

/// Text of the display property, or the key
fn display_text(metadata: &EntityMetadata, entity: &Value) -> String {
    let value = metadata
        .display_property
        .as_ref()
        .and_then(|name| entity.get(name))
        .or_else(|| entity.get(&metadata.key));
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Search and sort values carried by page links, as `&q=..&sort=..&order=..`
fn page_query<T>(model: &EntityViewModel<T>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in [("q", &model.search), ("sort", &model.sort), ("order", &model.order)] {
        if let Some(value) = value {
            serializer.append_pair(name, value);
        }
    }
    let query = serializer.finish();
    if query.is_empty() {
        query
    } else {
        format!("&{query}")
    }
}

fn button_json(button: &ViewButton, target: String) -> Value {
    json!({
        "Name": button.name,
        "Text": button.text,
        "Target": target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CustomDataType;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Serialize)]
    struct Thread {
        id: &'static str,
        title: &'static str,
        pinned: bool,
    }

    fn metadata() -> EntityMetadata {
        EntityMetadata::builder("Thread")
            .display_name("Threads")
            .property(PropertyMetadata::new("title", CustomDataType::Text).name("Title").required())
            .property(PropertyMetadata::new("pinned", CustomDataType::Boolean).name("Pinned"))
            .display_property("title")
            .build()
    }

    fn thread() -> Thread {
        Thread {
            id: "0f8e3a10-5a43-4e1c-9a43-5b1a59a0a7de",
            title: "<b>Welcome</b>",
            pinned: true,
        }
    }

    #[test]
    fn test_builtin_templates_compile() {
        let engine = ViewEngine::new().unwrap();
        for view in [INDEX_VIEW, EDIT_VIEW, DETAIL_VIEW, SELECTOR_VIEW, MULTIPLE_SELECTOR_VIEW] {
            assert!(engine.has_template(view), "{view} should be registered");
        }
    }

    #[test]
    fn test_editor_uses_type_partial() {
        let engine = ViewEngine::new().unwrap();
        let metadata = metadata();

        let html = engine.editor_for(&thread(), &metadata, "pinned").unwrap();
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("checked"));

        let html = engine.editor_for(&thread(), &metadata, "Title").unwrap();
        assert!(html.contains("name=\"title\""));
        assert!(html.contains("&lt;b&gt;Welcome&lt;/b&gt;"));
    }

    #[test]
    fn test_editor_with_value_overrides_entity_value() {
        let engine = ViewEngine::new().unwrap();
        let metadata = metadata();
        let title = metadata.get_property("title").unwrap();
        let html = engine.editor_with_value(&thread(), title, json!("Draft")).unwrap();
        assert!(html.contains("value=\"Draft\""));
    }

    #[test]
    fn test_viewer_for_unknown_property_fails() {
        let engine = ViewEngine::new().unwrap();
        let err = engine.viewer_for(&thread(), &metadata(), "missing").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_custom_partial_registration() {
        let mut engine = ViewEngine::new().unwrap();
        engine
            .register_template("ColorViewer", "<i style=\"color: {{Text}}\"></i>")
            .unwrap();
        let color = PropertyMetadata::new("title", CustomDataType::Text).custom_type("Color");
        let html = engine.viewer_with_value(&thread(), &color, json!("red")).unwrap();
        assert_eq!(html, "<i style=\"color: red\"></i>");
    }

    #[test]
    fn test_render_list() {
        let engine = ViewEngine::new().unwrap();
        let metadata = Arc::new(metadata());
        let model = EntityViewModel {
            items: vec![thread()],
            properties: metadata.view_properties().cloned().collect(),
            metadata,
            current_page: 1,
            current_size: 20,
            total_count: 1,
            page_size_options: vec![10, 20],
            search: None,
            sort: None,
            order: None,
            buttons: Vec::new(),
        };
        let html = engine.render_list(INDEX_VIEW, &model, "/threads").unwrap();
        assert!(html.contains("Threads"));
        assert!(html.contains("/threads/edit?id=0f8e3a10-5a43-4e1c-9a43-5b1a59a0a7de"));
        assert!(html.contains("&lt;b&gt;Welcome&lt;/b&gt;"));
    }

    #[test]
    fn test_render_list_buttons_and_page_links() {
        let engine = ViewEngine::new().unwrap();
        let metadata = Arc::new(metadata());
        let model = EntityViewModel {
            items: vec![thread()],
            properties: metadata.view_properties().cloned().collect(),
            metadata,
            current_page: 1,
            current_size: 1,
            total_count: 3,
            page_size_options: vec![10, 20],
            search: Some("c# & go".into()),
            sort: Some("title".into()),
            order: None,
            buttons: vec![
                ViewButton::new("export", "Export", "/threads/export"),
                ViewButton::new("history", "History", "/threads/history").per_item(),
            ],
        };
        let html = engine.render_list(INDEX_VIEW, &model, "/threads").unwrap();
        assert!(html.contains("href=\"/threads/index?page=2&size=1&q=c%23+%26+go&sort=title\">Next</a>"));
        assert!(html.contains("href=\"/threads/export\" data-button=\"export\">Export</a>"));
        assert!(html.contains("data-button=\"history\">History</a>"));
        assert!(html.contains("href=\"/threads/history?id"));
        assert_eq!(html.matches("data-button=\"export\"").count(), 1);
    }

    #[test]
    fn test_page_query_is_empty_without_search_or_sort() {
        let model = EntityViewModel::<()> {
            items: Vec::new(),
            metadata: Arc::new(metadata()),
            properties: Vec::new(),
            current_page: 1,
            current_size: 20,
            total_count: 0,
            page_size_options: Vec::new(),
            search: None,
            sort: None,
            order: None,
            buttons: Vec::new(),
        };
        assert_eq!(page_query(&model), "");
    }

    #[test]
    fn test_render_edit_for_new_item_has_no_key_field() {
        let engine = ViewEngine::new().unwrap();
        let metadata = Arc::new(metadata());
        let model = EntityEditModel {
            item: thread(),
            properties: metadata.edit_properties().cloned().collect(),
            metadata,
            is_new: true,
        };
        let html = engine
            .render_item(EDIT_VIEW, PartialKind::Editor, &model, "/threads")
            .unwrap();
        assert!(html.contains("action=\"/threads/update\""));
        assert!(!html.contains("name=\"id\""));
    }
}
