//! Property editors and viewers
//!
//! A property is rendered by the partial named after its type
//! (`BooleanEditor`, `DateViewer`, or `{CustomType}Editor` for custom types),
//! falling back to `DefaultEditor` / `DefaultViewer`. Partials receive an
//! [`EditorModel`].

use chrono::DateTime;
use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError};
use serde::Serialize;
use serde_json::Value;

use crate::json::PropertyMetadataJson;

pub const DEFAULT_EDITOR: &str = "DefaultEditor";
pub const DEFAULT_VIEWER: &str = "DefaultViewer";

/// Which partial family renders a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialKind {
    Editor,
    Viewer,
}

impl PartialKind {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Editor => "Editor",
            Self::Viewer => "Viewer",
        }
    }

    #[must_use]
    pub const fn fallback(self) -> &'static str {
        match self {
            Self::Editor => DEFAULT_EDITOR,
            Self::Viewer => DEFAULT_VIEWER,
        }
    }
}

/// Data handed to an editor or viewer partial
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EditorModel {
    pub metadata: PropertyMetadataJson,
    /// The raw JSON value
    pub value: Value,
    /// The value as form input text
    pub text: String,
    /// The value as shown to a reader (enum names, Yes/No)
    pub display: String,
    /// The owning entity
    pub entity: Value,
}

impl EditorModel {
    #[must_use]
    pub fn new(metadata: PropertyMetadataJson, value: Value, entity: Value) -> Self {
        let text = input_text(&metadata, &value);
        let display = display_text(&metadata, &value, &text);
        Self {
            metadata,
            value,
            text,
            display,
            entity,
        }
    }

    /// `{Type}` or, for `Other`, the custom type name
    #[must_use]
    pub fn template_prefix(&self) -> &str {
        match (self.metadata.data_type.as_str(), &self.metadata.custom_type) {
            ("Other", Some(custom)) => custom,
            (data_type, _) => data_type,
        }
    }

    /// Name of the partial rendering this model, honoring the fallback
    #[must_use]
    pub fn partial_name(&self, registry: &Handlebars<'_>, kind: PartialKind) -> String {
        let name = format!("{}{}", self.template_prefix(), kind.suffix());
        if registry.has_template(&name) {
            name
        } else {
            kind.fallback().to_string()
        }
    }

    /// Render through the type's partial
    ///
    /// # Errors
    ///
    /// Returns the handlebars error of the partial.
    pub fn render(&self, registry: &Handlebars<'_>, kind: PartialKind) -> Result<String, RenderError> {
        registry.render(&self.partial_name(registry, kind), self)
    }
}

fn input_text(metadata: &PropertyMetadataJson, value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if metadata.data_type == "DateTime" => DateTime::parse_from_rfc3339(s)
            .map_or_else(|_| s.clone(), |dt| dt.format("%Y-%m-%dT%H:%M").to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_text(metadata: &PropertyMetadataJson, value: &Value, text: &str) -> String {
    match (metadata.data_type.as_str(), value) {
        ("Boolean", Value::Bool(true)) => "Yes".to_string(),
        ("Boolean", Value::Bool(false)) => "No".to_string(),
        ("Enum", _) => metadata
            .enum_items
            .iter()
            .flatten()
            .find(|item| &item.value == value)
            .map_or_else(|| text.to_string(), |item| item.name.clone()),
        ("DateTime", _) => text.replacen('T', " ", 1),
        _ => text.to_string(),
    }
}

/// `{{editor entity "property"}}`
pub fn editor_helper(
    h: &Helper,
    r: &Handlebars,
    ctx: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    render_helper(h, r, ctx, out, PartialKind::Editor)
}

/// `{{viewer entity "property"}}`
pub fn viewer_helper(
    h: &Helper,
    r: &Handlebars,
    ctx: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    render_helper(h, r, ctx, out, PartialKind::Viewer)
}

/// Resolves the property from the `Metadata` of the page being rendered
fn render_helper(
    h: &Helper,
    r: &Handlebars,
    ctx: &Context,
    out: &mut dyn Output,
    kind: PartialKind,
) -> HelperResult {
    let entity = h
        .param(0)
        .map(|p| p.value().clone())
        .ok_or_else(|| RenderError::new("editor/viewer helper expects an entity"))?;
    let name = h
        .param(1)
        .and_then(|p| p.value().as_str())
        .ok_or_else(|| RenderError::new("editor/viewer helper expects a property name"))?;

    let property = ctx
        .data()
        .get("Metadata")
        .and_then(|metadata| metadata.get("Properties"))
        .and_then(Value::as_array)
        .and_then(|properties| {
            properties.iter().find(|p| {
                p.get("ClrName").and_then(Value::as_str) == Some(name)
                    || p.get("Name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
        })
        .ok_or_else(|| RenderError::new(format!("Unknown property '{name}'")))?;
    let metadata: PropertyMetadataJson = serde_json::from_value(property.clone())
        .map_err(|err| RenderError::new(format!("Invalid metadata for '{name}': {err}")))?;

    let value = entity.get(&metadata.clr_name).cloned().unwrap_or(Value::Null);
    let html = EditorModel::new(metadata, value, entity).render(r, kind)?;
    out.write(&html)?;
    Ok(())
}
