//! # Yatube Shared
//!
//! Wire types shared by the server and any client: request bodies,
//! the views a rendered page carries, and the error body.

pub mod dto;
pub mod response;

pub use response::{ErrorResponse, Rendered};
