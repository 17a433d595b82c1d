//! # Yatube Core
//!
//! The domain layer of the Yatube blog.
//! Entities, form validation and pagination live here, with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;

pub use error::DomainError;
