//! # Authentication & Authorization
//!
//! Entity controllers authorize every action against the entity's
//! [`EntityAuthentication`] policy, and hide or protect individual properties
//! through [`PropertyAuthorization`].
//!
//! The caller is resolved per request: an [`Authentication`] already stored in
//! the request extensions by upstream middleware (JWT, sessions, ...) wins;
//! otherwise the controller's [`AuthenticationProvider`] is asked.
//!
//! ```rust,ignore
//! async fn jwt_middleware(mut req: Request, next: Next) -> Response {
//!     let claims = decode_jwt(&req);
//!     req.extensions_mut().insert(Authentication::user(claims.sub, claims.roles));
//!     next.run(req).await
//! }
//! ```

use axum::http::request::Parts;

use crate::errors::ApiError;
use crate::metadata::EntityMetadata;

/// The caller of an action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    pub user: Option<String>,
    pub roles: Vec<String>,
}

impl Authentication {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user<I, S>(user: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: Some(user.into()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the caller satisfies `required` under `mode`; an empty list always passes
    #[must_use]
    pub fn has_roles(&self, required: &[String], mode: AuthenticationRequiredMode) -> bool {
        if required.is_empty() {
            return true;
        }
        match mode {
            AuthenticationRequiredMode::All => required.iter().all(|r| self.is_in_role(r)),
            AuthenticationRequiredMode::Any => required.iter().any(|r| self.is_in_role(r)),
        }
    }
}

/// Resolves the caller from the incoming request
pub trait AuthenticationProvider: Send + Sync {
    fn authenticate(&self, parts: &Parts) -> Authentication;
}

/// Reads the user name and comma-separated roles from request headers
///
/// Only suitable behind a trusted proxy that sets these headers.
#[derive(Debug, Clone)]
pub struct HeaderAuthenticationProvider {
    user_header: String,
    roles_header: String,
}

impl HeaderAuthenticationProvider {
    #[must_use]
    pub fn new(user_header: impl Into<String>, roles_header: impl Into<String>) -> Self {
        Self {
            user_header: user_header.into(),
            roles_header: roles_header.into(),
        }
    }
}

impl Default for HeaderAuthenticationProvider {
    fn default() -> Self {
        Self::new("x-user", "x-roles")
    }
}

impl AuthenticationProvider for HeaderAuthenticationProvider {
    fn authenticate(&self, parts: &Parts) -> Authentication {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        match header(&self.user_header) {
            Some(user) => Authentication::user(
                user,
                header(&self.roles_header)
                    .map(|roles| {
                        roles
                            .split(',')
                            .map(str::trim)
                            .filter(|r| !r.is_empty())
                            .map(String::from)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default(),
            ),
            None => Authentication::anonymous(),
        }
    }
}

/// The action an entity is authorized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityDomainAuthorizeOption {
    View,
    Create,
    Edit,
    Detail,
    Remove,
}

impl EntityDomainAuthorizeOption {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Detail => "detail",
            Self::Remove => "remove",
        }
    }
}

/// How a list of required roles is matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthenticationRequiredMode {
    /// The caller needs every listed role
    #[default]
    All,
    /// One listed role is enough
    Any,
}

/// Entity-level authorization policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityAuthentication {
    pub allow_anonymous: bool,
    pub view_roles: Vec<String>,
    pub add_roles: Vec<String>,
    pub edit_roles: Vec<String>,
    pub remove_roles: Vec<String>,
    pub mode: AuthenticationRequiredMode,
}

impl Default for EntityAuthentication {
    fn default() -> Self {
        Self {
            allow_anonymous: true,
            view_roles: Vec::new(),
            add_roles: Vec::new(),
            edit_roles: Vec::new(),
            remove_roles: Vec::new(),
            mode: AuthenticationRequiredMode::All,
        }
    }
}

impl EntityAuthentication {
    /// Policy requiring an authenticated caller for every action
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            allow_anonymous: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: AuthenticationRequiredMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn view_roles<I: IntoIterator<Item = S>, S: Into<String>>(mut self, roles: I) -> Self {
        self.view_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn add_roles<I: IntoIterator<Item = S>, S: Into<String>>(mut self, roles: I) -> Self {
        self.add_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn edit_roles<I: IntoIterator<Item = S>, S: Into<String>>(mut self, roles: I) -> Self {
        self.edit_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn remove_roles<I: IntoIterator<Item = S>, S: Into<String>>(mut self, roles: I) -> Self {
        self.remove_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Roles required for an action. Detail and edit also need the view roles.
    #[must_use]
    pub fn required_roles(&self, option: EntityDomainAuthorizeOption) -> Vec<String> {
        let mut roles = self.view_roles.clone();
        match option {
            EntityDomainAuthorizeOption::View | EntityDomainAuthorizeOption::Detail => {}
            EntityDomainAuthorizeOption::Create => roles.extend(self.add_roles.iter().cloned()),
            EntityDomainAuthorizeOption::Edit => roles.extend(self.edit_roles.iter().cloned()),
            EntityDomainAuthorizeOption::Remove => {
                roles.extend(self.remove_roles.iter().cloned());
            }
        }
        roles
    }
}

/// Property-level authorization policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAuthorization {
    pub allow_anonymous: bool,
    pub view_roles: Vec<String>,
    pub edit_roles: Vec<String>,
    pub mode: AuthenticationRequiredMode,
}

impl Default for PropertyAuthorization {
    fn default() -> Self {
        Self {
            allow_anonymous: true,
            view_roles: Vec::new(),
            edit_roles: Vec::new(),
            mode: AuthenticationRequiredMode::All,
        }
    }
}

impl PropertyAuthorization {
    #[must_use]
    pub fn can_view(&self, authentication: &Authentication) -> bool {
        if !self.allow_anonymous && !authentication.is_authenticated() {
            return false;
        }
        authentication.has_roles(&self.view_roles, self.mode)
    }

    #[must_use]
    pub fn can_edit(&self, authentication: &Authentication) -> bool {
        self.can_view(authentication) && authentication.has_roles(&self.edit_roles, self.mode)
    }
}

/// Check the entity policy for an action
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` when the caller is anonymous and the entity
/// does not allow it, or lacks a required role.
pub fn authorize(
    metadata: &EntityMetadata,
    authentication: &Authentication,
    option: EntityDomainAuthorizeOption,
) -> Result<(), ApiError> {
    let policy = &metadata.authentication;
    if !policy.allow_anonymous && !authentication.is_authenticated() {
        return Err(ApiError::unauthorized(format!(
            "Authentication is required to {} {}",
            option.as_str(),
            metadata.display_name
        )));
    }

    let required = policy.required_roles(option);
    if !authentication.has_roles(&required, policy.mode) {
        tracing::debug!(
            entity = %metadata.name,
            action = option.as_str(),
            user = ?authentication.user,
            "Caller lacks required roles"
        );
        return Err(ApiError::unauthorized(format!(
            "You are not allowed to {} {}",
            option.as_str(),
            metadata.display_name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn metadata(authentication: EntityAuthentication) -> EntityMetadata {
        EntityMetadata::builder("Thread")
            .display_name("threads")
            .authentication(authentication)
            .build()
    }

    #[test]
    fn test_anonymous_allowed_by_default() {
        let metadata = metadata(EntityAuthentication::default());
        for option in [
            EntityDomainAuthorizeOption::View,
            EntityDomainAuthorizeOption::Create,
            EntityDomainAuthorizeOption::Remove,
        ] {
            assert!(authorize(&metadata, &Authentication::anonymous(), option).is_ok());
        }
    }

    #[test]
    fn test_authenticated_policy_rejects_anonymous() {
        let metadata = metadata(EntityAuthentication::authenticated());
        let err = authorize(
            &metadata,
            &Authentication::anonymous(),
            EntityDomainAuthorizeOption::View,
        )
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), "Authentication is required to view threads");

        assert!(
            authorize(
                &metadata,
                &Authentication::user("ann", Vec::<String>::new()),
                EntityDomainAuthorizeOption::View
            )
            .is_ok()
        );
    }

    #[test]
    fn test_action_roles_add_to_view_roles() {
        let metadata = metadata(
            EntityAuthentication::authenticated()
                .view_roles(["member"])
                .remove_roles(["admin"]),
        );
        let member = Authentication::user("ann", ["member"]);
        let admin = Authentication::user("bob", ["member", "admin"]);

        assert!(authorize(&metadata, &member, EntityDomainAuthorizeOption::View).is_ok());
        assert!(authorize(&metadata, &member, EntityDomainAuthorizeOption::Remove).is_err());
        assert!(authorize(&metadata, &admin, EntityDomainAuthorizeOption::Remove).is_ok());
    }

    #[test]
    fn test_any_mode_accepts_one_role() {
        let metadata = metadata(
            EntityAuthentication::authenticated()
                .edit_roles(["editor", "admin"])
                .mode(AuthenticationRequiredMode::Any),
        );
        let editor = Authentication::user("ann", ["Editor"]);
        assert!(authorize(&metadata, &editor, EntityDomainAuthorizeOption::Edit).is_ok());
    }

    #[test]
    fn test_property_authorization() {
        let policy = PropertyAuthorization {
            allow_anonymous: false,
            view_roles: vec![],
            edit_roles: vec!["admin".to_string()],
            mode: AuthenticationRequiredMode::All,
        };
        let member = Authentication::user("ann", ["member"]);
        let admin = Authentication::user("bob", ["admin"]);

        assert!(!policy.can_view(&Authentication::anonymous()));
        assert!(policy.can_view(&member));
        assert!(!policy.can_edit(&member));
        assert!(policy.can_edit(&admin));
    }

    #[test]
    fn test_header_provider() {
        let provider = HeaderAuthenticationProvider::default();
        let (parts, ()) = Request::builder()
            .header("x-user", "ann")
            .header("x-roles", "member, admin,")
            .body(())
            .unwrap()
            .into_parts();

        let auth = provider.authenticate(&parts);
        assert_eq!(auth.user.as_deref(), Some("ann"));
        assert_eq!(auth.roles, ["member", "admin"]);

        let (parts, ()) = Request::builder().body(()).unwrap().into_parts();
        assert!(!provider.authenticate(&parts).is_authenticated());
    }
}
