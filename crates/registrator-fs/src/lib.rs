//! Filesystem layer for registrator
//!
//! Provides the durable write discipline used by the identity ledger,
//! content signatures for definition files, and definition-file discovery.

pub mod checksum;
pub mod error;
pub mod io;
pub mod scan;

pub use checksum::{content_signature, file_signature};
pub use error::{Error, Result};
pub use scan::{DefinitionFilter, DEFINITION_EXTENSION};
