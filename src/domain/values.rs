use std::str::FromStr;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::ApiError;

/// Name of the request value carrying an entity key
pub const ID_KEY: &str = "id";

/// Request values of one action: query string, then form fields or JSON body
///
/// Later sources override earlier ones. Lookups match the exact key first and
/// fall back to a case-insensitive match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueProvider {
    values: Map<String, Value>,
    from_form: bool,
}

impl ValueProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Values from string pairs (query string or urlencoded form)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut provider = Self::new();
        provider.extend_pairs(pairs);
        provider
    }

    pub fn extend_pairs<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.values.insert(key.into(), Value::String(value.into()));
        }
    }

    /// Merge a JSON object body; non-object bodies are ignored
    pub fn extend_json(&mut self, body: Value) {
        if let Value::Object(map) = body {
            self.values.extend(map);
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Mark the values as coming from an HTML form post
    ///
    /// Browsers omit unchecked checkboxes, so an absent boolean field reads as `false`.
    pub fn set_form(&mut self, from_form: bool) {
        self.from_form = from_form;
    }

    #[must_use]
    pub fn is_form(&self) -> bool {
        self.from_form
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).or_else(|| {
            self.values
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The value as text; `null` reads as absent
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The value parsed as `T`; absent or unparsable values read as `None`
    #[must_use]
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get_str(key).and_then(|s| s.trim().parse().ok())
    }

    /// The `id` value, if one was supplied
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when the value is not a UUID.
    pub fn get_id(&self) -> Result<Option<Uuid>, ApiError> {
        match self.get_str(ID_KEY) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => Uuid::parse_str(raw.trim())
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("'{raw}' is not a valid id"))),
        }
    }

    /// The `id` value of an action that needs one
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when the id is missing or malformed.
    pub fn require_id(&self, resource: &str) -> Result<Uuid, ApiError> {
        self.get_id()?
            .ok_or_else(|| ApiError::bad_request(format!("An id is required to load a {resource}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_lookup_falls_back_to_case_insensitive() {
        let values = ValueProvider::from_pairs([("Title", "hello")]);
        assert_eq!(values.get_str("Title").as_deref(), Some("hello"));
        assert_eq!(values.get_str("title").as_deref(), Some("hello"));
        assert!(values.get("body").is_none());
    }

    #[test]
    fn test_json_body_overrides_query() {
        let mut values = ValueProvider::from_pairs([("page", "1"), ("title", "query")]);
        values.extend_json(json!({"title": "body", "count": 3, "gone": null}));
        assert_eq!(values.get_str("title").as_deref(), Some("body"));
        assert_eq!(values.get_parsed::<u64>("count"), Some(3));
        assert_eq!(values.get_parsed::<u64>("page"), Some(1));
        assert!(values.contains("gone"));
        assert_eq!(values.get_str("gone"), None);
    }

    #[test]
    fn test_get_parsed_ignores_garbage() {
        let values = ValueProvider::from_pairs([("page", "two")]);
        assert_eq!(values.get_parsed::<u64>("page"), None);
    }

    #[test]
    fn test_get_id() {
        let id = Uuid::new_v4();
        let values = ValueProvider::from_pairs([("id", id.to_string())]);
        assert_eq!(values.get_id().unwrap(), Some(id));

        let blank = ValueProvider::from_pairs([("id", " ")]);
        assert_eq!(blank.get_id().unwrap(), None);

        let bad = ValueProvider::from_pairs([("id", "42")]);
        assert_eq!(bad.get_id().unwrap_err().status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_require_id_reports_missing_id() {
        let err = ValueProvider::new().require_id("thread").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "An id is required to load a thread");
    }
}
