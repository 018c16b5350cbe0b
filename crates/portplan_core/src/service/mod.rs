//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate resolver, query and report layers into caller-level APIs.
//! - Keep the CLI decoupled from storage details.

pub mod report_service;
