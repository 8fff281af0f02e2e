//! rentsync development backend
//!
//! An in-memory REST server exposing the resource API that
//! [`rentsync_core::HttpRemote`] talks to. Used for local development and
//! end-to-end tests of the sync engine.

pub mod server;

pub use server::{router, ApiError, ResourceStore};
