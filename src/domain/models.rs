use std::sync::Arc;

use crate::metadata::{EntityMetadata, PropertyMetadata};
use crate::validation::ValidationErrors;

/// A page of entities for the list, selector and multiple-selector actions
#[derive(Debug, Clone)]
pub struct EntityViewModel<T> {
    pub items: Vec<T>,
    pub metadata: Arc<EntityMetadata>,
    /// Columns shown to the caller
    pub properties: Vec<PropertyMetadata>,
    /// 1-based
    pub current_page: u64,
    pub current_size: u64,
    pub total_count: u64,
    pub page_size_options: Vec<u64>,
    pub search: Option<String>,
    /// Raw `sort` and `order` request values, kept for page links
    pub sort: Option<String>,
    pub order: Option<String>,
    pub buttons: Vec<ViewButton>,
}

impl<T> EntityViewModel<T> {
    /// Number of pages; an empty list still has one page
    #[must_use]
    pub fn total_page(&self) -> u64 {
        if self.current_size == 0 {
            return 1;
        }
        self.total_count.div_ceil(self.current_size).max(1)
    }
}

/// A link on list pages, either for the whole list or for every row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewButton {
    pub name: String,
    pub text: String,
    /// Relative to the controller mount until resolved by [`ViewButton::set_target`]
    pub target: String,
    /// Rendered on each row with `id=<key>` appended
    pub per_item: bool,
}

impl ViewButton {
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            target: target.into(),
            per_item: false,
        }
    }

    #[must_use]
    pub fn per_item(mut self) -> Self {
        self.per_item = true;
        self
    }

    /// Resolve a relative target against the path the controller is mounted at
    ///
    /// Targets starting with `/` or carrying a scheme are left as they are.
    pub fn set_target(&mut self, base_path: &str) {
        if self.target.starts_with('/') || self.target.contains("://") {
            return;
        }
        self.target = format!("{}/{}", base_path.trim_end_matches('/'), self.target);
    }

    /// Target for one row
    #[must_use]
    pub fn item_target(&self, key: &str) -> String {
        let separator = if self.target.contains('?') { '&' } else { '?' };
        format!("{}{separator}id={key}", self.target)
    }
}

/// One entity for the create, edit and detail actions
#[derive(Debug, Clone)]
pub struct EntityEditModel<T> {
    pub item: T,
    pub metadata: Arc<EntityMetadata>,
    /// Fields shown to the caller
    pub properties: Vec<PropertyMetadata>,
    /// The item has not been stored yet
    pub is_new: bool,
}

/// Outcome of the update action
#[derive(Debug, Clone)]
pub struct EntityUpdateModel<T> {
    /// The stored entity, when the update succeeded
    pub item: Option<T>,
    pub errors: ValidationErrors,
    pub is_new: bool,
}

impl<T> EntityUpdateModel<T> {
    #[must_use]
    pub fn success(item: T, is_new: bool) -> Self {
        Self {
            item: Some(item),
            errors: ValidationErrors::new(),
            is_new,
        }
    }

    #[must_use]
    pub fn failure(errors: ValidationErrors, is_new: bool) -> Self {
        Self {
            item: None,
            errors,
            is_new,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
