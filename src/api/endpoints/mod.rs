//! API endpoint handlers, one module per resource.
//!
//! Handlers take `Result<Json<T>, JsonRejection>` so malformed bodies
//! come back in the envelope instead of axum's plain-text rejection.

pub mod auth;
pub mod medicines;
pub mod patients;
pub mod prescriptions;
