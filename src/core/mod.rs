// Entity contract shared by the domain services, binders and controllers

pub mod traits;

pub use traits::EntityResource;
