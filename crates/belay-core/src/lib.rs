//! Belay Core: domain models, request context, error types and
//! repository traits shared by every other crate.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;
