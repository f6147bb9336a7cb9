//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator, rejects before any handler touches the store
//! 2. Audit logger, runs after auth so it knows the user

pub mod audit;
pub mod auth;
