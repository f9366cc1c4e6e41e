//! Diagnostics handed to the host's reporter.
//!
//! Each validation error becomes one or more [`Diagnostic`]s pointing at the
//! exact defective element. Messages close with the interface shape the
//! declaration should implement, computed from its own type parameters and
//! whatever valid witness was found, so a reader can fix the declaration
//! without looking anything up.

use crate::errors::ValidationError;
use hktgen_types::{DeclKind, DeclaredType, Declaration, EncodingFamily};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::error;

/// The element a diagnostic is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributedElement {
    Declaration {
        id: String,
    },
    TypeParameter {
        owner: String,
        name: String,
        index: usize,
    },
    Witness {
        owner: String,
        name: String,
    },
}

impl fmt::Display for AttributedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributedElement::Declaration { id } => write!(f, "{}", id),
            AttributedElement::TypeParameter { owner, name, .. } => {
                write!(f, "{}<{}>", owner, name)
            }
            AttributedElement::Witness { name, .. } => write!(f, "{}", name),
        }
    }
}

/// One reportable defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable code (`HKT001`..).
    pub code: String,
    /// Name of the validation error variant.
    pub error_kind: String,
    pub element: AttributedElement,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}: {}", self.code, self.element, self.message)
    }
}

#[derive(Debug, Error)]
#[error("diagnostic sink failed: {0}")]
pub struct SinkError(pub String);

/// Destination for diagnostics. Failures are logged by the caller and never
/// stop generation.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic) -> Result<(), SinkError>;
}

/// Keeps every diagnostic in memory.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) -> Result<(), SinkError> {
        self.diagnostics.lock().push(diagnostic.clone());
        Ok(())
    }
}

/// Emits each diagnostic as an `error` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) -> Result<(), SinkError> {
        error!(
            code = %diagnostic.code,
            element = %diagnostic.element,
            "{}",
            diagnostic.message
        );
        Ok(())
    }
}

/// What the renderer knows about a validated (or rejected) declaration.
pub struct DiagnosticContext<'a> {
    pub family: &'a EncodingFamily,
    pub declaration: &'a Declaration,
    /// Qualified name of the implemented encoding interface, without arguments.
    pub interface_name: String,
    /// A witness that passed the witness check, if any.
    pub valid_witness: Option<&'a DeclaredType>,
    /// Marker name to suggest when no valid witness exists.
    pub marker_name: &'a str,
}

impl DiagnosticContext<'_> {
    /// `<decl> should implements|extends <expected shape>`.
    pub fn guidance(&self) -> String {
        let decl = self.declaration;
        let keyword = decl.kind.implements_keyword();
        let shape = match self.valid_witness {
            Some(witness) => self
                .family
                .expected_interface(&witness.render_in(""), &decl.type_params),
            None if decl.type_params.len() <= 1 => self
                .family
                .expected_interface(&decl.wildcard_type().render_in(""), &decl.type_params),
            None => format!(
                "{} with {} being the following nested class of {}:\n    public static final class {} {{}}",
                self.family
                    .expected_interface(self.marker_name, &decl.type_params),
                self.marker_name,
                decl.id(),
                self.marker_name
            ),
        };
        format!("{} should {} {}", decl.id(), keyword, shape)
    }

    /// Render every error, in order, into diagnostics.
    pub fn render(&self, errors: &[ValidationError]) -> Vec<Diagnostic> {
        let guidance = self.guidance();
        errors
            .iter()
            .flat_map(|err| self.render_one(err, &guidance))
            .collect()
    }

    fn render_one(&self, err: &ValidationError, guidance: &str) -> Vec<Diagnostic> {
        let decl = self.declaration;
        let id = decl.id();
        let iface = &self.interface_name;
        let make = |element: AttributedElement, message: String| Diagnostic {
            code: err.code().to_string(),
            error_kind: err.kind().to_string(),
            element,
            message,
        };
        let at_decl = || AttributedElement::Declaration { id: id.clone() };

        match err {
            ValidationError::InterfaceDeclarationIsRawType { .. } => vec![make(
                at_decl(),
                format!("{iface} interface declaration is missing type arguments:\n{guidance}"),
            )],
            ValidationError::NeedsAtLeastOneTypeParameter => vec![make(
                at_decl(),
                format!(
                    "{id} need at least one type parameter to correctly implement {iface}:\n{guidance}"
                ),
            )],
            ValidationError::ArityOutOfRange { count, max } => vec![make(
                at_decl(),
                format!(
                    "{id} has {count} type parameters but the encoding supports at most {max}:\n{guidance}"
                ),
            )],
            ValidationError::WrongArityInterface { .. } => vec![make(
                at_decl(),
                format!(
                    "{iface} is not the correct interface to use.\nGiven the number of type parameters, {guidance}"
                ),
            )],
            ValidationError::TypeParameterOrderMismatch { positions } => positions
                .iter()
                .map(|&index| {
                    let name = decl.type_params.get(index).cloned().unwrap_or_default();
                    make(
                        AttributedElement::TypeParameter {
                            owner: id.clone(),
                            name,
                            index,
                        },
                        format!(
                            "The type parameters of {id} must appear in the same order in the declaration of {iface}:\n{guidance}"
                        ),
                    )
                })
                .collect(),
            ValidationError::WitnessNotValid { .. } => vec![make(
                at_decl(),
                format!(
                    "Type constructor witness (first type argument of {iface}) is incorrect:\n{guidance}"
                ),
            )],
            ValidationError::NestedWitnessHasTypeParameters { witness } => vec![make(
                AttributedElement::Witness {
                    owner: id.clone(),
                    name: witness.clone(),
                },
                format!(
                    "The nested class used as type constructor witness must not take any type parameter:\n{guidance}"
                ),
            )],
            ValidationError::NestedWitnessVisibilityMismatch {
                witness,
                requires_public,
            } => {
                let modifiers = if *requires_public { "public static" } else { "static" };
                let final_kw = if decl.kind == DeclKind::Interface { "" } else { " final" };
                vec![make(
                    AttributedElement::Witness {
                        owner: id.clone(),
                        name: witness.clone(),
                    },
                    format!(
                        "The nested class used as type constructor witness must be '{modifiers}{final_kw}':\n{guidance}"
                    ),
                )]
            }
            ValidationError::AmbiguousEncodingInterface { candidates } => vec![make(
                at_decl(),
                format!(
                    "{id} implements more than one encoding interface ({}); exactly one is allowed:\n{guidance}",
                    candidates.join(", ")
                ),
            )],
            ValidationError::InvalidConfiguration(source) => vec![make(
                at_decl(),
                format!("Invalid code generation configuration for {id}: {source}"),
            )],
        }
    }
}

/// Deliver diagnostics to `sink`; returns how many deliveries failed.
pub fn deliver(sink: &dyn DiagnosticSink, diagnostics: &[Diagnostic]) -> usize {
    let mut failed = 0;
    for diagnostic in diagnostics {
        if let Err(e) = sink.report(diagnostic) {
            tracing::warn!(code = %diagnostic.code, error = %e, "failed to report diagnostic");
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use hktgen_types::{Access, RawFragment};

    fn decl(params: &[&str]) -> Declaration {
        Declaration {
            package: "com.example".into(),
            name: "Pair".into(),
            kind: DeclKind::Class,
            visibility: Access::Public,
            is_static: false,
            type_params: params.iter().map(|p| p.to_string()).collect(),
            interfaces: vec![],
            members: vec![],
            annotations: vec![],
            scopes: vec![],
            config: RawFragment::new(),
        }
    }

    fn ctx<'a>(
        family: &'a EncodingFamily,
        d: &'a Declaration,
        witness: Option<&'a DeclaredType>,
    ) -> DiagnosticContext<'a> {
        DiagnosticContext {
            family,
            declaration: d,
            interface_name: "org.derive4j.hkt.__3".into(),
            valid_witness: witness,
            marker_name: "µ",
        }
    }

    #[test]
    fn test_guidance_with_valid_witness() {
        let family = EncodingFamily::default();
        let d = decl(&["A", "B"]);
        let w = DeclaredType::new("com.example", "Pair.µ", vec![]);
        assert_eq!(
            ctx(&family, &d, Some(&w)).guidance(),
            "com.example.Pair should implements org.derive4j.hkt.__2<com.example.Pair.µ, A, B>"
        );
    }

    #[test]
    fn test_guidance_suggests_marker_class() {
        let family = EncodingFamily::default();
        let d = decl(&["A", "B"]);
        let g = ctx(&family, &d, None).guidance();
        assert!(g.contains("org.derive4j.hkt.__2<µ, A, B> with µ being"));
        assert!(g.ends_with("public static final class µ {}"));
    }

    #[test]
    fn test_guidance_single_param_uses_wildcard() {
        let family = EncodingFamily::default();
        let mut d = decl(&["A"]);
        d.kind = DeclKind::Interface;
        assert_eq!(
            ctx(&family, &d, None).guidance(),
            "com.example.Pair should extends org.derive4j.hkt.__<com.example.Pair<?>, A>"
        );
    }

    #[test]
    fn test_order_mismatch_attributed_per_parameter() {
        let family = EncodingFamily::default();
        let d = decl(&["A", "B"]);
        let diags = ctx(&family, &d, None).render(&[ValidationError::TypeParameterOrderMismatch {
            positions: vec![0, 1],
        }]);
        assert_eq!(diags.len(), 2);
        assert!(matches!(
            &diags[1].element,
            AttributedElement::TypeParameter { name, index: 1, .. } if name == "B"
        ));
        assert!(diags.iter().all(|d| d.code == "HKT004"));
    }

    struct FailingSink;

    impl DiagnosticSink for FailingSink {
        fn report(&self, _: &Diagnostic) -> Result<(), SinkError> {
            Err(SinkError("reporter gone".into()))
        }
    }

    #[test]
    fn test_deliver_counts_failures() {
        let family = EncodingFamily::default();
        let d = decl(&[]);
        let diags = ctx(&family, &d, None).render(&[ValidationError::NeedsAtLeastOneTypeParameter]);
        assert_eq!(deliver(&FailingSink, &diags), 1);

        let sink = CollectingSink::new();
        assert_eq!(deliver(&sink, &diags), 0);
        assert_eq!(sink.len(), 1);

        assert_eq!(deliver(&TracingSink, &diags), 0);
    }
}
