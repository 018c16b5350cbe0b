//! Attribute resolution: string keys to resolved attribute descriptors.
//!
//! # Responsibility
//! - Hold the startup-validated attribute registry.
//! - Locate keys outside the registry with the catalog naming convention.
//!
//! # Invariants
//! - Registry ambiguity is fatal at startup; request-time ambiguity is an
//!   internal error.

pub mod registry;
pub mod resolver;
