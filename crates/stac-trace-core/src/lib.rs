//! # STAC Trace Core
//!
//! Shared, I/O-free logic for STAC Trace: catalog item models, the
//! taskable-sensor filter, the item store abstraction, and the hotspot
//! clustering engine.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.

pub mod cluster;
pub mod filter;
pub mod hull;
pub mod models;
pub mod store;
