//! Data models representing database entities and API payloads.

/// Credit ledger model
pub mod credit_transaction;
/// Deployment model and deploy/list payloads
pub mod deployment;
pub mod invocation;
pub mod payment;
/// User identity and balance
pub mod user;
