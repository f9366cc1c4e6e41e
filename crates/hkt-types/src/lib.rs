//! Shared types for the hktgen workspace.
//!
//! This crate holds the pieces every other crate needs and that carry no
//! behaviour of their own:
//!
//! - [`encoding`] - the arity-indexed wrapper family and its currying law
//! - [`metadata`] - typed views over candidate declarations as discovery hands them over
//! - [`type_parsing`] - reading generic type strings back out of generated sources

pub mod encoding;
pub mod metadata;
pub mod type_parsing;

// Re-export commonly used types at crate root
pub use encoding::{Arity, EncodingFamily, InvalidArity, MAX_ARITY};
pub use metadata::{
    qualify, Access, DeclKind, DeclaredType, Declaration, MemberType, RawFragment, Scope,
    ScopeKind, TypeRef,
};
pub use type_parsing::{parse_type_expr, split_type_params, NameScope, TypeExpr};
