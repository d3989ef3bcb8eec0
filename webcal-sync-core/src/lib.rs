//! Core types for webcal-sync.
//!
//! This crate holds everything that does not talk to the network:
//! - `event` types for feed events and the destination store's events
//! - `identity`, `normalize` and `compare`, the building blocks of the diff
//! - `reconcile`, which turns a feed and the store's current state into a plan
//! - `sync`, which applies a plan through the `EventStore` trait
//! - `ics` feed parsing and `config` loading

pub mod compare;
pub mod config;
pub mod error;
pub mod event;
pub mod ics;
pub mod identity;
pub mod normalize;
pub mod reconcile;
pub mod sync;

pub use error::{SyncError, SyncResult};
pub use event::*;
