//! # Entity Controller
//!
//! [`EntityController`] exposes the domain service of one entity as a router:
//!
//! | method | path | action |
//! |---|---|---|
//! | GET | `/`, `/index` | list |
//! | GET | `/create` | blank edit form |
//! | GET | `/edit?id=` | edit form |
//! | GET | `/detail?id=` | detail page |
//! | GET | `/selector` | single selection list |
//! | GET | `/multiple-selector` | multiple selection list |
//! | POST | `/update` | insert or update, 204 on success |
//! | POST | `/remove` | delete, 200 on success |
//!
//! GET actions answer JSON when the content header (`accept-content` by
//! default) contains `application/json`, and HTML otherwise.
//!
//! ```rust,ignore
//! let views = Arc::new(ViewEngine::from_options(&options)?);
//! let app = Router::new().nest(
//!     "/threads",
//!     EntityController::<DefaultEntityDomainService<thread::Model>>::new(db, views).router(),
//! );
//! ```

mod request;

pub use request::ActionRequest;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use hyper::header::CONTENT_TYPE;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::config::ControllerOptions;
use crate::core::EntityResource;
use crate::domain::{DefaultEntityDomainService, DomainContext, EntityDomainService};
use crate::errors::ApiError;
use crate::json::{edit_model_to_json, view_model_to_json};
use crate::security::{
    AuthenticationProvider, EntityDomainAuthorizeOption, HeaderAuthenticationProvider,
};
use crate::view::{
    DETAIL_VIEW, EDIT_VIEW, INDEX_VIEW, MULTIPLE_SELECTOR_VIEW, PartialKind, SELECTOR_VIEW,
    ViewEngine,
};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Controller serving one entity through its domain service
pub struct EntityController<S: EntityDomainService> {
    service: S,
    db: DatabaseConnection,
    views: Arc<ViewEngine>,
    authentication: Arc<dyn AuthenticationProvider>,
    options: Arc<ControllerOptions>,
}

impl<T: EntityResource> EntityController<DefaultEntityDomainService<T>> {
    /// Controller for `T` with the default domain service
    #[must_use]
    pub fn new(db: DatabaseConnection, views: Arc<ViewEngine>) -> Self {
        Self::with_service(DefaultEntityDomainService::new(), db, views)
    }
}

impl<S: EntityDomainService> EntityController<S> {
    #[must_use]
    pub fn with_service(service: S, db: DatabaseConnection, views: Arc<ViewEngine>) -> Self {
        Self {
            service,
            db,
            views,
            authentication: Arc::new(HeaderAuthenticationProvider::default()),
            options: Arc::new(ControllerOptions::default()),
        }
    }

    /// Replace the provider resolving the caller (`x-user` / `x-roles` headers by default)
    #[must_use]
    pub fn with_authentication(mut self, provider: impl AuthenticationProvider + 'static) -> Self {
        self.authentication = Arc::new(provider);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[must_use]
    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Router with every action, to be nested under the entity's path
    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(index::<S>))
            .route("/index", get(index::<S>))
            .route("/create", get(create::<S>))
            .route("/edit", get(edit::<S>))
            .route("/detail", get(detail::<S>))
            .route("/selector", get(selector::<S>))
            .route("/multiple-selector", get(multiple_selector::<S>))
            .route("/update", post(update::<S>))
            .route("/remove", post(remove::<S>))
            .with_state(Arc::new(self))
    }

    async fn context(&self, request: Request) -> Result<(DomainContext, ActionRequest), ApiError> {
        let action = ActionRequest::read(
            request,
            &self.options.content_header,
            self.authentication.as_ref(),
        )
        .await?;
        let ctx = DomainContext::new(
            self.db.clone(),
            action.authentication.clone(),
            action.values.clone(),
            Arc::clone(&self.options),
        );
        Ok((ctx, action))
    }

    async fn list_view(&self, request: Request, view: &'static str) -> Result<Response, ApiError> {
        let (ctx, action) = self.context(request).await?;
        let entity = <S::Entity as EntityResource>::RESOURCE_NAME_PLURAL;
        tracing::debug!(entity, view, json = action.wants_json, "List action");

        let mut model = self.service.list(&ctx).await?;
        for button in &mut model.buttons {
            button.set_target(&action.base_path);
        }
        if action.wants_json {
            json_response(&view_model_to_json(&model))
        } else {
            Ok(Html(self.views.render_list(view, &model, &action.base_path)?).into_response())
        }
    }

    async fn item_view(
        &self,
        request: Request,
        option: EntityDomainAuthorizeOption,
    ) -> Result<Response, ApiError> {
        let (ctx, action) = self.context(request).await?;
        let entity = <S::Entity as EntityResource>::RESOURCE_NAME_SINGULAR;
        tracing::debug!(entity, action = option.as_str(), json = action.wants_json, "Item action");

        let (model, view, kind) = match option {
            EntityDomainAuthorizeOption::Create => {
                (self.service.create(&ctx).await?, EDIT_VIEW, PartialKind::Editor)
            }
            EntityDomainAuthorizeOption::Edit => {
                (self.service.edit(&ctx).await?, EDIT_VIEW, PartialKind::Editor)
            }
            _ => (self.service.detail(&ctx).await?, DETAIL_VIEW, PartialKind::Viewer),
        };
        if action.wants_json {
            json_response(&edit_model_to_json(&model))
        } else {
            Ok(Html(self.views.render_item(view, kind, &model, &action.base_path)?).into_response())
        }
    }
}

fn json_response<D: Serialize>(data: &D) -> Result<Response, ApiError> {
    let body = serde_json::to_string(data)
        .map_err(|err| ApiError::internal("Failed to serialize response", Some(err.to_string())))?;
    Ok(([(CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response())
}

type Controller<S> = State<Arc<EntityController<S>>>;

async fn index<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<Response, ApiError> {
    controller.list_view(request, INDEX_VIEW).await
}

async fn selector<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<Response, ApiError> {
    controller.list_view(request, SELECTOR_VIEW).await
}

async fn multiple_selector<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<Response, ApiError> {
    controller.list_view(request, MULTIPLE_SELECTOR_VIEW).await
}

async fn create<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<Response, ApiError> {
    controller.item_view(request, EntityDomainAuthorizeOption::Create).await
}

async fn edit<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<Response, ApiError> {
    controller.item_view(request, EntityDomainAuthorizeOption::Edit).await
}

async fn detail<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<Response, ApiError> {
    controller.item_view(request, EntityDomainAuthorizeOption::Detail).await
}

/// 204 when stored, 400 with the per-property errors otherwise
async fn update<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<StatusCode, ApiError> {
    let (ctx, _) = controller.context(request).await?;
    let model = controller.service.update(&ctx).await?;
    if model.is_success() {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::validation_failed(model.errors))
    }
}

async fn remove<S: EntityDomainService>(
    State(controller): Controller<S>,
    request: Request,
) -> Result<StatusCode, ApiError> {
    let (ctx, _) = controller.context(request).await?;
    controller.service.remove(&ctx).await?;
    Ok(StatusCode::OK)
}
