//! Shared test utilities for the cog workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`project`] — [`TestProject`](project::TestProject) builder for a
//!   sandboxed project with a canonical store and provider directories

pub mod project;

pub use project::TestProject;
