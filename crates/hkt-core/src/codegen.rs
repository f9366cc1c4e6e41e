//! Accessor generation.
//!
//! Every validated declaration contributes one entry to the class named by
//! its configuration: a coercion method performing the single unchecked cast
//! from the curried wrapper view to the declaration's own type, plus an
//! optional type-equality witness. Entries are merged with whatever the class
//! already contains before it is rewritten.

use crate::config::GenVisibility;
use crate::errors::GenerateError;
use crate::merge::{merge_entries, parse_generated};
use crate::store::{ArtifactStore, FileLocks, OutputFileKey};
use crate::validator::ValidatedDeclaration;
use hktgen_types::{DeclaredType, EncodingFamily, TypeRef};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const UNCHECKED: &str = "@SuppressWarnings(\"unchecked\")";

const INDENT: &str = "    ";

/// Visibility of one generated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryVisibility {
    Public,
    Package,
}

impl EntryVisibility {
    fn modifier(self) -> &'static str {
        match self {
            EntryVisibility::Public => "public ",
            EntryVisibility::Package => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Coerce,
    TypeEq,
}

/// One rendered method, without indentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMethod {
    pub kind: MethodKind,
    pub name: String,
    pub text: String,
}

/// All methods of one generated class attributable to one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMethodEntry {
    /// Identity of the owning declaration.
    pub owner: String,
    pub visibility: EntryVisibility,
    pub methods: Vec<GeneratedMethod>,
}

impl GeneratedMethodEntry {
    pub fn uses_type_eq(&self) -> bool {
        self.methods.iter().any(|m| m.kind == MethodKind::TypeEq)
    }

    pub fn source_text(&self) -> String {
        self.methods
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Why a valid declaration produced no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Configuration turned generation off.
    Disabled,
    /// An annotation hands generation to another tool.
    Delegated,
    /// The declaration cannot be named from a package-level class.
    Unreachable,
    /// The encoding interface lacks a witness or type arguments to curry.
    MalformedInterface,
}

/// What generation does with one validated declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Generate(GeneratedMethodEntry),
    Skip(SkipReason),
}

/// Renders types as they appear inside a generated class of one package.
///
/// The arity-1 wrapper and the type-equality witness are imported; other
/// types of the same package are unqualified, everything else qualified.
struct Renderer<'a> {
    family: &'a EncodingFamily,
    package: &'a str,
}

impl Renderer<'_> {
    fn render(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Declared(d) => self.render_declared(d),
            other => other.render_in(self.package),
        }
    }

    fn render_declared(&self, d: &DeclaredType) -> String {
        let imported = d.package == self.family.namespace
            && (d.name == self.family.base_symbol || d.name == self.family.type_eq_symbol);
        let base = if imported || d.package == self.package || d.package.is_empty() {
            d.name.clone()
        } else {
            d.qualified_name()
        };
        if d.args.is_empty() {
            base
        } else {
            let args: Vec<String> = d.args.iter().map(|a| self.render(a)).collect();
            format!("{}<{}>", base, args.join(", "))
        }
    }
}

/// Output class a validated declaration belongs to.
pub fn output_key(v: &ValidatedDeclaration) -> OutputFileKey {
    OutputFileKey::new(
        v.declaration.package.clone(),
        v.config.output_class_name.clone(),
    )
}

/// Decide what to generate for one declaration.
pub fn plan_entry(family: &EncodingFamily, v: &ValidatedDeclaration) -> Plan {
    let decl = &v.declaration;
    let config = &v.config;

    if config.visibility == GenVisibility::Disabled {
        return Plan::Skip(SkipReason::Disabled);
    }
    if config.is_delegated(decl) {
        return Plan::Skip(SkipReason::Delegated);
    }
    if !decl.is_reachable_from_package() {
        warn!(
            decl = %decl.id(),
            "declaration is not visible from its package, skipping accessor generation"
        );
        return Plan::Skip(SkipReason::Unreachable);
    }

    let Some(curried) = family.curry(&v.interface) else {
        warn!(
            decl = %decl.id(),
            interface = %v.interface.qualified_name(),
            "encoding interface cannot be curried, skipping"
        );
        return Plan::Skip(SkipReason::MalformedInterface);
    };

    let visibility = match config.visibility {
        GenVisibility::Same if decl.is_public() => EntryVisibility::Public,
        _ => EntryVisibility::Package,
    };

    let renderer = Renderer {
        family,
        package: &decl.package,
    };
    let type_vars = format!("<{}>", decl.type_params.join(", "));
    let self_type = renderer.render(&TypeRef::Declared(decl.self_type()));
    let hkt_type = renderer.render(&curried);
    let vis = visibility.modifier();

    let coerce_name = config.coerce_method_name(decl.simple_name());
    let mut methods = vec![GeneratedMethod {
        kind: MethodKind::Coerce,
        text: format!(
            "{UNCHECKED}\n{vis}static {type_vars} {self_type} {coerce_name}(final {hkt_type} hkt) {{ return ({self_type}) hkt; }}"
        ),
        name: coerce_name,
    }];

    if let Some(type_eq_name) = config.type_eq_method_name(decl.simple_name()) {
        let type_eq = &family.type_eq_symbol;
        methods.push(GeneratedMethod {
            kind: MethodKind::TypeEq,
            text: format!(
                "{UNCHECKED}\n{vis}static {type_vars} {type_eq}<{hkt_type}, {self_type}> {type_eq_name}() {{ return ({type_eq}) {type_eq}.refl(); }}"
            ),
            name: type_eq_name,
        });
    }

    Plan::Generate(GeneratedMethodEntry {
        owner: decl.id(),
        visibility,
        methods,
    })
}

/// Render a complete class from its entries, in order.
pub fn render_file(
    family: &EncodingFamily,
    key: &OutputFileKey,
    entries: &[GeneratedMethodEntry],
) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !key.package.is_empty() {
        lines.push(format!("package {};", key.package));
        lines.push(String::new());
    }

    let mut imports = BTreeSet::new();
    if !entries.is_empty() {
        imports.insert(format!("{}.{}", family.namespace, family.base_symbol));
    }
    if entries.iter().any(GeneratedMethodEntry::uses_type_eq) {
        imports.insert(format!("{}.{}", family.namespace, family.type_eq_symbol));
    }
    if !imports.is_empty() {
        for import in &imports {
            lines.push(format!("import {};", import));
        }
        lines.push(String::new());
    }

    let public = entries
        .iter()
        .any(|e| e.visibility == EntryVisibility::Public);
    lines.push(format!(
        "{}final class {} {{",
        if public { "public " } else { "" },
        key.class_name
    ));
    lines.push(String::new());
    lines.push(format!("{INDENT}private {}() {{}}", key.class_name));

    for entry in entries {
        for method in &entry.methods {
            lines.push(String::new());
            for line in method.text.lines() {
                lines.push(format!("{INDENT}{line}"));
            }
        }
    }

    lines.push("}".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Status of one output file after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Written,
    /// Regenerated text was identical to the existing file.
    Unchanged,
    /// No existing file and nothing to put in a new one.
    NotCreated,
}

/// Outcome of generating one output file.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub key: OutputFileKey,
    pub status: FileStatus,
    /// Entries in the final file.
    pub entries: usize,
    /// Entries carried over from the previous file.
    pub kept: usize,
    /// Methods of the previous file that could not be attributed and were dropped.
    pub dropped: usize,
    pub public: bool,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Read, merge and rewrite output files through an [`ArtifactStore`].
pub struct Generator {
    family: EncodingFamily,
    store: Arc<dyn ArtifactStore>,
    locks: FileLocks,
}

impl Generator {
    pub fn new(family: EncodingFamily, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            family,
            store,
            locks: FileLocks::new(),
        }
    }

    /// Regenerate `key` for `decls`, which must all belong to that file.
    ///
    /// Holds the file's writer lock from the read until the write completes.
    pub fn generate(
        &self,
        key: &OutputFileKey,
        decls: &[ValidatedDeclaration],
    ) -> Result<GeneratedFile, GenerateError> {
        let mut ordered: Vec<&ValidatedDeclaration> = decls.iter().collect();
        ordered.sort_by_key(|v| v.id());

        let mut owners = BTreeSet::new();
        let mut fresh = Vec::new();
        let mut skipped = Vec::new();
        for v in ordered {
            owners.insert(v.id());
            match plan_entry(&self.family, v) {
                Plan::Generate(entry) => fresh.push(entry),
                Plan::Skip(reason) => {
                    debug!(decl = %v.id(), ?reason, "no accessor generated");
                    skipped.push((v.id(), reason));
                }
            }
        }

        let lock = self.locks.lock_for(key);
        let _guard = lock.lock();

        let existing = self
            .store
            .read(key)
            .map_err(|source| GenerateError::Read {
                file: key.qualified_name(),
                source,
            })?;

        let previous = match &existing {
            Some(text) => parse_generated(&self.family, key, text),
            None => Default::default(),
        };
        let dropped = previous.dropped;
        let (entries, kept) = merge_entries(previous.entries, &owners, fresh);

        let public = entries
            .iter()
            .any(|e| e.visibility == EntryVisibility::Public);
        let mut result = GeneratedFile {
            key: key.clone(),
            status: FileStatus::NotCreated,
            entries: entries.len(),
            kept,
            dropped,
            public,
            skipped,
        };

        if existing.is_none() && entries.is_empty() {
            debug!(file = %key, "nothing to generate");
            return Ok(result);
        }

        let text = render_file(&self.family, key, &entries);
        if existing.as_deref() == Some(text.as_str()) {
            debug!(file = %key, "generated file unchanged");
            result.status = FileStatus::Unchanged;
            return Ok(result);
        }

        self.store
            .write(key, &text)
            .map_err(|source| GenerateError::Write {
                file: key.qualified_name(),
                source,
            })?;
        info!(file = %key, entries = entries.len(), kept, "wrote generated file");
        result.status = FileStatus::Written;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectiveConfig;
    use hktgen_types::{Access, Arity, DeclKind, Declaration, MemberType, RawFragment};

    fn pair(visibility: GenVisibility) -> ValidatedDeclaration {
        let family = EncodingFamily::default();
        let witness: TypeRef = DeclaredType::new("com.example", "Pair.µ", vec![]).into();
        let interface = family.apply(
            Arity::new(2).unwrap(),
            witness,
            vec![TypeRef::var("A"), TypeRef::var("B")],
        );
        ValidatedDeclaration {
            declaration: Declaration {
                package: "com.example".into(),
                name: "Pair".into(),
                kind: DeclKind::Class,
                visibility: Access::Public,
                is_static: false,
                type_params: vec!["A".into(), "B".into()],
                interfaces: vec![interface.clone().into()],
                members: vec![MemberType {
                    name: "µ".into(),
                    kind: DeclKind::Class,
                    visibility: Access::Public,
                    is_static: true,
                    type_params: vec![],
                }],
                annotations: vec![],
                scopes: vec![],
                config: RawFragment::new(),
            },
            interface,
            arity: Arity::new(2).unwrap(),
            config: Arc::new(EffectiveConfig {
                visibility,
                ..EffectiveConfig::default()
            }),
        }
    }

    fn entry_of(plan: Plan) -> GeneratedMethodEntry {
        match plan {
            Plan::Generate(e) => e,
            Plan::Skip(r) => panic!("unexpected skip: {r:?}"),
        }
    }

    #[test]
    fn test_coerce_and_type_eq_text() {
        let family = EncodingFamily::default();
        let entry = entry_of(plan_entry(&family, &pair(GenVisibility::Same)));
        assert_eq!(entry.owner, "com.example.Pair");
        assert_eq!(entry.visibility, EntryVisibility::Public);
        assert_eq!(entry.methods.len(), 2);
        assert_eq!(entry.methods[0].name, "asPair");
        assert_eq!(
            entry.methods[0].text,
            "@SuppressWarnings(\"unchecked\")\npublic static <A, B> Pair<A, B> asPair(final __<__<Pair.µ, A>, B> hkt) { return (Pair<A, B>) hkt; }"
        );
        assert_eq!(
            entry.methods[1].text,
            "@SuppressWarnings(\"unchecked\")\npublic static <A, B> TypeEq<__<__<Pair.µ, A>, B>, Pair<A, B>> pair() { return (TypeEq) TypeEq.refl(); }"
        );
    }

    #[test]
    fn test_package_visibility_and_disabled() {
        let family = EncodingFamily::default();
        let entry = entry_of(plan_entry(&family, &pair(GenVisibility::Package)));
        assert_eq!(entry.visibility, EntryVisibility::Package);
        assert!(entry.methods[0].text.contains("\nstatic <A, B>"));

        assert_eq!(
            plan_entry(&family, &pair(GenVisibility::Disabled)),
            Plan::Skip(SkipReason::Disabled)
        );
    }

    #[test]
    fn test_delegated_and_unreachable() {
        let family = EncodingFamily::default();
        let mut delegated = pair(GenVisibility::Same);
        delegated.declaration.annotations = vec!["org.derive4j.Data".into()];
        delegated.config = Arc::new(EffectiveConfig {
            delegate_to: ["Data".to_string()].into_iter().collect(),
            ..EffectiveConfig::default()
        });
        assert_eq!(
            plan_entry(&family, &delegated),
            Plan::Skip(SkipReason::Delegated)
        );

        let mut private = pair(GenVisibility::Same);
        private.declaration.visibility = Access::Private;
        assert_eq!(
            plan_entry(&family, &private),
            Plan::Skip(SkipReason::Unreachable)
        );
    }

    #[test]
    fn test_uncurriable_interface_is_malformed() {
        let family = EncodingFamily::default();
        let mut v = pair(GenVisibility::Same);
        v.interface.args.truncate(1);
        assert_eq!(
            plan_entry(&family, &v),
            Plan::Skip(SkipReason::MalformedInterface)
        );
    }

    #[test]
    fn test_type_eq_disabled_by_empty_template() {
        let family = EncodingFamily::default();
        let mut v = pair(GenVisibility::Same);
        v.config = Arc::new(EffectiveConfig {
            type_eq_method_template: String::new(),
            ..EffectiveConfig::default()
        });
        let entry = entry_of(plan_entry(&family, &v));
        assert_eq!(entry.methods.len(), 1);
        assert!(!entry.uses_type_eq());
    }

    #[test]
    fn test_render_file_layout() {
        let family = EncodingFamily::default();
        let key = OutputFileKey::new("com.example", "Hkt");
        let entry = entry_of(plan_entry(&family, &pair(GenVisibility::Same)));
        let text = render_file(&family, &key, &[entry]);
        let expected = "package com.example;

import org.derive4j.hkt.TypeEq;
import org.derive4j.hkt.__;

public final class Hkt {

    private Hkt() {}

    @SuppressWarnings(\"unchecked\")
    public static <A, B> Pair<A, B> asPair(final __<__<Pair.µ, A>, B> hkt) { return (Pair<A, B>) hkt; }

    @SuppressWarnings(\"unchecked\")
    public static <A, B> TypeEq<__<__<Pair.µ, A>, B>, Pair<A, B>> pair() { return (TypeEq) TypeEq.refl(); }
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_empty_class_is_package_private() {
        let family = EncodingFamily::default();
        let key = OutputFileKey::new("com.example", "Hkt");
        let text = render_file(&family, &key, &[]);
        assert!(text.contains("\nfinal class Hkt {"));
        assert!(!text.contains("import"));
    }
}
