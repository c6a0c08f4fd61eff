//! HTTP surface for the game hosting platform.
//!
//! Thin transport shell: every route in `routes` deserializes its request,
//! checks authorization where the path identifies an actor, and calls
//! straight into `platform_core`. No business logic lives here. Exposed as
//! a library, not just a binary, so `tests/` can drive the real `Router`
//! in process.

pub mod auth;
pub mod envelope;
pub mod games;
pub mod ratings;
pub mod rooms;
pub mod routes;
pub mod state;
