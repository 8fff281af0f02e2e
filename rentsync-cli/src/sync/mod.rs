//! Wiring between the CLI's SQLite stores and the core sync engine.

mod auto_sync;
mod engine;

pub use auto_sync::try_auto_sync;
pub use engine::SyncEngine;
