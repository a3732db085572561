//! Order routing & real-time synchronization engine
//!
//! Coordinates food orders between order intake and kitchen preparation
//! stations and keeps display consumers in sync with kitchen reality.
//!
//! # Components
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`stations`] | Active preparation station registry (read-mostly) |
//! | [`routing`] | Decides target station(s) for a new order |
//! | [`ledger`] | Per-(order, station) lifecycle: routed → started → completed, with recall |
//! | [`tables`] | Per-table priority grouping for the display |
//! | [`cache`] | Tagged TTL cache in front of all read paths |
//! | [`realtime`] | Resilient change-feed subscription (backoff, breaker, dedup) |
//! | [`engine`] | Constructed service object wiring everything, `init`/`shutdown` |
//!
//! The persistent store and its change-feed are external collaborators
//! reached through the [`store`] traits; [`store::MemoryStore`] is an
//! in-process implementation for tests and embedding.

pub mod cache;
pub mod core;
pub mod engine;
pub mod ledger;
pub mod realtime;
pub mod routing;
pub mod stations;
pub mod store;
pub mod tables;
pub mod utils;

// Re-exports for consumers
pub use crate::core::{EngineConfig, EngineError, EngineResult};
pub use engine::KitchenEngine;
pub use realtime::ConnectionStatus;
pub use store::{ChangeFeed, EngineStore, MemoryStore};
