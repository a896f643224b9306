//! Chronicle Core: event-sourcing abstractions.
//!
//! This crate defines the contracts every event-sourced component depends on:
//! domain events and their identities, aggregate replay, the event store
//! contract and the repository that couples the two. It contains no I/O.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod registry;
pub mod repository;
pub mod serializer;
pub mod store;
