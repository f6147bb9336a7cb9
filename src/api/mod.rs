//! Clinic HTTP API.
//!
//! JSON over HTTP. Every route except `POST /api/login` requires
//! `Authorization: Bearer <token>`, and every response uses the
//! `{success, data?, message?, error?}` envelope.
//!
//! The router is composable: `clinic_api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::clinic_api_router;
pub use server::{start_server_on, ClinicServer};
pub use types::{ApiContext, Envelope, LoginRequest, LoginResponse};
