//! hktgen: validation and accessor generation for arity-encoded type constructors.
//!
//! The heavy lifting lives in the workspace crates; this crate adds the JSON
//! input boundary used by the `hktgen` binary.
//!
//! - [`hktgen_types`] - encoding model and declaration metadata
//! - [`hktgen_core`] - configuration, validation, generation and merge
//! - [`manifest`] - loading candidate declarations from JSON

pub mod manifest;

pub use hktgen_core;
pub use hktgen_types;
pub use manifest::CandidateManifest;
