//! Request middleware: session tracking and the admin guard.

pub mod auth;

pub use auth::{require_admin, session_middleware, AdminSession, CurrentSession};
