//! Shared test utilities for the registrator workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each grow their own fake backend. It is a dev-dependency only; never
//! published.
//!
//! # Modules
//!
//! - [`adapter`]: [`RecordingAdapter`], an in-memory backend that records calls
//! - [`dir`]: [`ConfigDir`], a temporary definition directory

pub mod adapter;
pub mod dir;

pub use adapter::{Call, RecordingAdapter};
pub use dir::{definition, ConfigDir};
