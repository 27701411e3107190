//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! Each one receives its collaborators (store, providers) at construction.

pub mod billing;
/// Metered invocation gateway
pub mod gateway;
pub mod pricing;
/// Deployment registry
pub mod registry;
/// Dashboard session tokens
pub mod session;
