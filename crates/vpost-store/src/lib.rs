//! SQLite-backed durable store for jobs and posts.
//!
//! The store is the only shared state between concurrently running
//! jobs. It is an explicitly constructed handle with an open/close
//! lifecycle, injected into every component that needs it.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::JobStore;
