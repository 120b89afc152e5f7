//! Generic entity controllers for Axum and Sea-ORM.
//!
//! Describe an entity once with [`EntityMetadata`], implement
//! [`EntityResource`] on its model, and nest an [`EntityController`] to get
//! list, create, edit, detail, selector, update and remove actions. Every GET
//! action renders a Handlebars view or, when asked for, metadata-driven JSON.

pub mod config;
pub mod controller;
pub mod core;
pub mod domain;
pub mod errors;
pub mod json;
pub mod metadata;
pub mod security;
pub mod validation;
pub mod view;

pub use config::ControllerOptions;
pub use controller::{ActionRequest, EntityController};
pub use crate::core::EntityResource;
pub use domain::{
    DefaultEntityDomainService, DomainContext, EntityDomainService, EntityEditModel,
    EntityUpdateModel, EntityViewModel, ValueProvider, ViewButton,
};
pub use errors::ApiError;
pub use metadata::{
    CustomDataType, EntityDescriptor, EntityMetadata, EnumDisplay, EnumItem, PropertyMetadata,
};
pub use security::{
    Authentication, AuthenticationProvider, AuthenticationRequiredMode, EntityAuthentication,
    EntityDomainAuthorizeOption, HeaderAuthenticationProvider,
};
pub use validation::{Validatable, ValidationError, ValidationErrors};
pub use view::ViewEngine;
