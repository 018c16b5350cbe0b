//! Transient descriptors shared by the resolver, query and report layers.
//!
//! # Responsibility
//! - Define the resolved attribute shape consumed by every engine stage.
//! - Define filter selections and text-search modes.
//!
//! # Invariants
//! - Nothing in this module is persisted; descriptors are views over the
//!   schema catalog plus freshly queried choices.

pub mod attribute;
