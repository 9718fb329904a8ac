//! Shared Kernel - Domain-crossing minimal core
//!
//! Vocabulary shared by every crate in the workspace:
//! - The unified [`error::app_error::AppError`] returned at the HTTP boundary
//! - Typed integer IDs for persisted entities
//!
//! Only things with the same meaning in every bounded context belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
