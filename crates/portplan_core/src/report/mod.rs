//! Breakdown and report projection over filtered project sets.
//!
//! # Responsibility
//! - Partition projects per value of one attribute.
//! - Format per-project rows with column metadata and table options.

pub mod breakdown;
pub mod projector;
