//! Validation and accessor generation for arity-encoded type constructors.
//!
//! A declaration such as `Pair<A, B>` encodes itself as a type constructor by
//! implementing `__2<Pair.µ, A, B>`. This crate checks that contract and
//! generates the one sanctioned unchecked cast per declaration:
//!
//! - [`config`] - effective configuration from the enclosing-scope chain
//! - [`validator`] - structural checks, all failures accumulated
//! - [`diagnostics`] - reporter-facing rendering with fix-it guidance
//! - [`codegen`] / [`merge`] - accessor rendering and reconciliation with prior output
//! - [`store`] - whole-file, atomic persistence
//! - [`pipeline`] - one round over a batch of candidates

pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod merge;
pub mod pipeline;
pub mod store;
pub mod validator;

pub use codegen::{
    EntryVisibility, FileStatus, GeneratedFile, GeneratedMethodEntry, Generator, SkipReason,
};
pub use config::{ConfigOverride, ConfigResolver, EffectiveConfig, GenVisibility};
pub use diagnostics::{
    AttributedElement, CollectingSink, Diagnostic, DiagnosticSink, SinkError, TracingSink,
};
pub use errors::{ConfigError, GenerateError, ValidationError};
pub use pipeline::{FailureReport, FileError, Pipeline, RunReport};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, OutputFileKey};
pub use validator::{Outcome, ValidatedDeclaration, Validator};
