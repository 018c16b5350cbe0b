//! Static description of the portfolio store and its forms.
//!
//! # Responsibility
//! - Declare tables, columns and relationships once, validated at startup.
//! - Declare the form fields that own labels and choice ordering.
//!
//! # Invariants
//! - Catalog and forms are immutable after construction and safe to share
//!   between any number of readers.

pub mod catalog;
pub mod forms;
pub mod portfolio;
