//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to a service
//! 3. Returns HTTP response (JSON, status code)

/// Deploy, list, options and invoke endpoints
pub mod deployments;
pub mod health;
/// Credit purchase endpoints
pub mod payments;
