//! Versioned in-memory storage arena for Harbor Commerce.
//!
//! This crate provides the storage primitives the domain layer builds on:
//!
//! - **Versioned entries**: every value carries a monotonically increasing
//!   version, so writers can detect and reject stale writes instead of
//!   silently clobbering a concurrent update.
//! - **Per-key serialization**: mutations to the same key serialize on a
//!   per-entry lock; mutations to different keys proceed independently.
//! - **Atomic read-modify-write**: [`Arena::update`] runs a closure under
//!   the entry lock, closing the read-check-then-write race that a naive
//!   read-then-write at the application layer would leave open.
//!
//! The arena is deliberately domain-free: it stores any `Clone` payload
//! keyed by string, the way a SQL table stores rows keyed by primary key.

pub mod arena;
pub mod error;

pub use arena::{Arena, Versioned};
pub use error::{StoreError, UpdateError};
