//! Model deployment gateway.
//!
//! Users deploy a model from a fixed catalogue, receive a per-deployment API key, buy credits
//! through a payment processor and spend them invoking the model. Every invocation is
//! authenticated against the deployment key and pre-paid with an atomic conditional debit
//! before it reaches the upstream inference provider.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payment_providers;
pub mod services;
pub mod store;
pub mod upstream;

pub use app::{AppState, create_router};
