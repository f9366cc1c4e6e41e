//! Declaration validation.
//!
//! A candidate declaration is an encoded type constructor when it directly
//! implements one member of the wrapper family. The validator then runs every
//! structural check against that interface and keeps all failures, so a single
//! pass surfaces every defect of the declaration at once.

use crate::config::{ConfigResolver, EffectiveConfig};
use crate::diagnostics::{Diagnostic, DiagnosticContext};
use crate::errors::ValidationError;
use hktgen_types::{
    Access, Arity, DeclKind, DeclaredType, Declaration, EncodingFamily, MemberType, TypeRef,
    MAX_ARITY,
};
use std::sync::Arc;
use tracing::debug;

/// A declaration that passed every check.
#[derive(Debug, Clone)]
pub struct ValidatedDeclaration {
    pub declaration: Declaration,
    /// The implemented wrapper application, e.g. `__2<Pair.µ, A, B>`.
    pub interface: DeclaredType,
    pub arity: Arity,
    pub config: Arc<EffectiveConfig>,
}

impl ValidatedDeclaration {
    pub fn id(&self) -> String {
        self.declaration.id()
    }
}

/// A declaration with at least one defect.
#[derive(Debug, Clone)]
pub struct Failure {
    pub declaration: Declaration,
    pub errors: Vec<ValidationError>,
    /// `errors` rendered for the reporter, in the same order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of validating one candidate.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The declaration does not implement an encoding interface.
    NotApplicable,
    Valid(ValidatedDeclaration),
    Failed(Failure),
}

/// Which encoding interface a declaration implements.
#[derive(Debug)]
pub enum Located<'d> {
    None,
    One(&'d DeclaredType),
    Ambiguous(Vec<&'d DeclaredType>),
}

/// Validates candidates against one encoding family.
///
/// Holds no mutable state of its own; the config resolver's memo is the only
/// shared structure, so one validator can serve many threads.
pub struct Validator<'a> {
    family: &'a EncodingFamily,
    resolver: &'a ConfigResolver,
}

impl<'a> Validator<'a> {
    pub fn new(family: &'a EncodingFamily, resolver: &'a ConfigResolver) -> Self {
        Self { family, resolver }
    }

    /// Find the encoding interface among the directly implemented ones.
    ///
    /// Interfaces whose arguments are all type variables are skipped: a
    /// declaration generic over a wrapper-shaped parameter is not itself an
    /// encoded type constructor.
    pub fn locate_interface<'d>(&self, decl: &'d Declaration) -> Located<'d> {
        let mut found: Vec<&DeclaredType> = decl
            .interfaces
            .iter()
            .filter_map(TypeRef::as_declared)
            .filter(|iface| self.family.is_family_member(iface))
            .filter(|iface| iface.args.is_empty() || !iface.args.iter().all(TypeRef::is_type_var))
            .collect();

        match found.len() {
            0 => Located::None,
            1 => Located::One(found.remove(0)),
            _ => Located::Ambiguous(found),
        }
    }

    pub fn validate(&self, decl: &Declaration) -> Outcome {
        let outcome = match self.locate_interface(decl) {
            Located::None => Outcome::NotApplicable,
            Located::One(iface) => self.validate_against(decl, iface),
            Located::Ambiguous(candidates) => self.ambiguous(decl, &candidates),
        };
        match &outcome {
            Outcome::NotApplicable => debug!(decl = %decl.id(), "not an encoded type constructor"),
            Outcome::Valid(v) => debug!(decl = %decl.id(), arity = %v.arity, "valid"),
            Outcome::Failed(f) => {
                debug!(decl = %decl.id(), errors = f.errors.len(), "validation failed")
            }
        }
        outcome
    }

    fn validate_against(&self, decl: &Declaration, iface: &DeclaredType) -> Outcome {
        let witness = iface.args.first();
        let valid_witness = witness.and_then(|w| self.valid_witness(decl, w));
        let nested = witness
            .and_then(TypeRef::as_declared)
            .and_then(|w| decl.member_for(w).map(|m| (w, m)));

        let mut errors = Vec::new();
        errors.extend(self.check_not_raw(iface));
        errors.extend(self.check_has_type_parameters(decl));
        errors.extend(self.check_arity(decl, iface));
        errors.extend(self.check_type_parameter_order(decl, iface));
        if let Some(w) = witness {
            if valid_witness.is_none() {
                errors.push(ValidationError::WitnessNotValid {
                    witness: w.render_in(""),
                });
            }
        }
        if let Some((w, member)) = nested {
            errors.extend(self.check_nested_witness_is_simple(w, member));
            errors.extend(self.check_nested_witness_modifiers(decl, w, member));
        }

        let config = self.resolver.resolve(decl);
        let config = match config {
            Ok(config) => Some(config),
            Err(e) => {
                errors.push(ValidationError::InvalidConfiguration(e));
                None
            }
        };

        match (errors.is_empty(), config, self.family.arity_of(iface)) {
            (true, Some(config), Some(arity)) => Outcome::Valid(ValidatedDeclaration {
                declaration: decl.clone(),
                interface: iface.clone(),
                arity,
                config,
            }),
            (_, config, _) => {
                let marker = config
                    .as_deref()
                    .unwrap_or(self.resolver.defaults())
                    .witness_marker_name
                    .clone();
                let ctx = DiagnosticContext {
                    family: self.family,
                    declaration: decl,
                    interface_name: iface.qualified_name(),
                    valid_witness,
                    marker_name: &marker,
                };
                let diagnostics = ctx.render(&errors);
                Outcome::Failed(Failure {
                    declaration: decl.clone(),
                    errors,
                    diagnostics,
                })
            }
        }
    }

    fn ambiguous(&self, decl: &Declaration, candidates: &[&DeclaredType]) -> Outcome {
        let errors = vec![ValidationError::AmbiguousEncodingInterface {
            candidates: candidates.iter().map(|c| c.render_in("")).collect(),
        }];
        let ctx = DiagnosticContext {
            family: self.family,
            declaration: decl,
            interface_name: candidates
                .first()
                .map(|c| c.qualified_name())
                .unwrap_or_default(),
            valid_witness: None,
            marker_name: &self.resolver.defaults().witness_marker_name,
        };
        let diagnostics = ctx.render(&errors);
        Outcome::Failed(Failure {
            declaration: decl.clone(),
            errors,
            diagnostics,
        })
    }

    /// The witness if it is the declaration's erasure, the declaration over
    /// wildcards, or a type nested directly inside the declaration.
    pub fn valid_witness<'w>(
        &self,
        decl: &Declaration,
        witness: &'w TypeRef,
    ) -> Option<&'w DeclaredType> {
        let w = witness.as_declared()?;
        let is_self = *w == decl.erasure() || *w == decl.wildcard_type();
        if is_self || decl.member_for(w).is_some() {
            Some(w)
        } else {
            None
        }
    }

    fn check_not_raw(&self, iface: &DeclaredType) -> Option<ValidationError> {
        iface
            .is_raw()
            .then(|| ValidationError::InterfaceDeclarationIsRawType {
                interface: iface.qualified_name(),
            })
    }

    fn check_has_type_parameters(&self, decl: &Declaration) -> Option<ValidationError> {
        decl.type_params
            .is_empty()
            .then_some(ValidationError::NeedsAtLeastOneTypeParameter)
    }

    /// Out-of-range parameter counts have no correct interface to point at,
    /// so they replace the wrong-arity report.
    fn check_arity(&self, decl: &Declaration, iface: &DeclaredType) -> Option<ValidationError> {
        let count = decl.type_params.len();
        if count > MAX_ARITY as usize {
            return Some(ValidationError::ArityOutOfRange {
                count,
                max: MAX_ARITY as usize,
            });
        }
        let found = self.family.arity_of(iface)?.type_param_count();
        (found != count + 1).then(|| ValidationError::WrongArityInterface {
            interface: iface.qualified_name(),
            found,
            expected: count + 1,
        })
    }

    fn check_type_parameter_order(
        &self,
        decl: &Declaration,
        iface: &DeclaredType,
    ) -> Option<ValidationError> {
        let overlap = decl.type_params.len().min(iface.args.len().saturating_sub(1));
        let positions: Vec<usize> = (0..overlap)
            .filter(|&i| iface.args[i + 1].as_type_var() != Some(decl.type_params[i].as_str()))
            .collect();
        (!positions.is_empty()).then_some(ValidationError::TypeParameterOrderMismatch { positions })
    }

    fn check_nested_witness_is_simple(
        &self,
        witness: &DeclaredType,
        member: &MemberType,
    ) -> Option<ValidationError> {
        (!member.type_params.is_empty()).then(|| ValidationError::NestedWitnessHasTypeParameters {
            witness: witness.qualified_name(),
        })
    }

    fn check_nested_witness_modifiers(
        &self,
        decl: &Declaration,
        witness: &DeclaredType,
        member: &MemberType,
    ) -> Option<ValidationError> {
        let is_static = member.is_static
            || member.kind.is_implicitly_static()
            || decl.kind == DeclKind::Interface;
        let requires_public = decl.is_public() && decl.kind != DeclKind::Interface;
        let visible = !requires_public || member.visibility == Access::Public;

        (!(is_static && visible)).then(|| ValidationError::NestedWitnessVisibilityMismatch {
            witness: witness.qualified_name(),
            requires_public,
        })
    }
}
