//! Request handlers over the entity repository.
//!
//! An activity takes string request values and query parameters, resolves a
//! request context, calls the repository and answers with JSON values or a
//! typed error code.

pub mod activity;
pub mod error;
pub mod get_entities_by_category;
pub mod get_entity;
pub mod save_entity;
pub mod set_entity_status;

pub use activity::{Activity, ActivityRequest, ActivityResult, ActivityValues};
pub use error::{ActivityError, ActivityErrorId};
pub use get_entities_by_category::GetEntitiesByCategoryActivity;
pub use get_entity::GetEntityActivity;
pub use save_entity::SaveEntityActivity;
pub use set_entity_status::SetEntityStatusActivity;
