//! qra-daemon library target.
//!
//! Exposes the router, state, rotator and mode switch for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod dispatch;
pub mod publisher;
pub mod rotator;
pub mod routes;
pub mod state;
pub mod switch;
pub mod views;
