//! Middleware for the procedure layer.

pub mod auth;

pub use auth::{protected_procedure, ProcedureContext, ProtectedContext};
