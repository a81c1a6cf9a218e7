//! Server unit and integration tests.
//!
//! Tests are organized into modules by feature area:
//! - `common` - Shared test helpers and utilities
//! - `handlers` - HTTP handler tests driven through the router
//! - `flows` - Multi-step user journeys across handlers
