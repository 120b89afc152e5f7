use axum::{
    Form, Json,
    extract::{FromRequest, OriginalUri, Query, Request},
    http::{Method, request::Parts},
};
use hyper::header::CONTENT_TYPE;
use serde_json::Value;

use crate::domain::ValueProvider;
use crate::errors::ApiError;
use crate::security::{Authentication, AuthenticationProvider};

/// What an action needs from the HTTP request
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub values: ValueProvider,
    pub authentication: Authentication,
    /// The content header asked for `application/json`
    pub wants_json: bool,
    /// Path the controller is mounted under, without a trailing slash
    pub base_path: String,
}

impl ActionRequest {
    /// Read the query string and, for POST, the urlencoded form or JSON body
    ///
    /// An [`Authentication`] placed in the request extensions by upstream
    /// middleware takes precedence over `provider`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when the query or body cannot be parsed.
    pub async fn read(
        request: Request,
        content_header: &str,
        provider: &dyn AuthenticationProvider,
    ) -> Result<Self, ApiError> {
        let (parts, body) = request.into_parts();

        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        let mut values = ValueProvider::from_pairs(pairs);

        let authentication = parts
            .extensions
            .get::<Authentication>()
            .cloned()
            .unwrap_or_else(|| provider.authenticate(&parts));
        let wants_json = header_contains(&parts, content_header, "application/json");
        let base_path = base_path(&parts);

        if parts.method == Method::POST {
            let content_type = header_value(&parts, CONTENT_TYPE.as_str()).unwrap_or_default();
            let request = Request::from_parts(parts, body);
            if content_type.starts_with("application/json") {
                let Json(body) = Json::<Value>::from_request(request, &())
                    .await
                    .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
                values.extend_json(body);
            } else if content_type.starts_with("application/x-www-form-urlencoded") {
                let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, &())
                    .await
                    .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
                values.extend_pairs(fields);
                values.set_form(true);
            }
        }

        Ok(Self {
            values,
            authentication,
            wants_json,
            base_path,
        })
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
}

fn header_contains(parts: &Parts, name: &str, needle: &str) -> bool {
    header_value(parts, name).is_some_and(|v| v.contains(needle))
}

/// The full request path minus the path matched inside the controller router
fn base_path(parts: &Parts) -> String {
    let local = parts.uri.path().trim_end_matches('/');
    let original = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path());
    original
        .trim_end_matches('/')
        .strip_suffix(local)
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string()
}
