//! Request middleware.
//!
//! Only dashboard routes pass through here. Invocation and payment webhook routes carry
//! their own credentials (deployment key, processor signature).

/// Session token authentication middleware
pub mod auth;
