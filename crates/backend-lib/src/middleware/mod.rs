// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the finance API.

pub mod authenticate;

pub use authenticate::{authenticate, bearer_token, establish_identity, Stage, BEARER_PREFIX};
