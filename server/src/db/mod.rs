//! PostgreSQL persistence for the `postgres:` remote store.

mod blobs;
mod pool;

pub use blobs::*;
pub use pool::*;
