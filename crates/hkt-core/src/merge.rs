//! Reading previously generated classes back and reconciling them with a
//! fresh run.
//!
//! Each method of an existing class is attributed to a declaration by its
//! shape alone: a coercion method returns the owner's type from a curried
//! wrapper parameter, a type-equality witness returns `TypeEq<curried, owner>`.
//! Methods matching neither shape cannot be attributed and are dropped.

use crate::codegen::{EntryVisibility, GeneratedMethod, GeneratedMethodEntry, MethodKind};
use crate::store::OutputFileKey;
use hktgen_types::{parse_type_expr, split_type_params, DeclaredType, EncodingFamily, NameScope};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

/// Entries recovered from an existing file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    /// In file order; methods of one owner are grouped under its first appearance.
    pub entries: Vec<GeneratedMethodEntry>,
    /// Methods that could not be attributed to an owner.
    pub dropped: usize,
}

/// A method signature split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature<'s> {
    public: bool,
    type_vars: Vec<String>,
    return_type: &'s str,
    name: &'s str,
    params: &'s str,
}

/// Recover generated entries from the text of an existing class.
pub fn parse_generated(family: &EncodingFamily, key: &OutputFileKey, text: &str) -> ParsedFile {
    let imports = collect_imports(text);
    let mut parsed = ParsedFile::default();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut annotations: Vec<&str> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.starts_with('@') {
            annotations.push(line);
            continue;
        }
        let Some(sig) = parse_signature(line) else {
            annotations.clear();
            continue;
        };

        let scope = NameScope {
            package: &key.package,
            imports: &imports,
            type_vars: &sig.type_vars,
        };
        let mut method_text = annotations.join("\n");
        if !method_text.is_empty() {
            method_text.push('\n');
        }
        method_text.push_str(line);
        annotations.clear();

        let Some((kind, owner)) = attribute(family, &scope, &sig) else {
            warn!(file = %key, method = sig.name, "dropping generated method that matches no known shape");
            parsed.dropped += 1;
            continue;
        };

        let visibility = if sig.public {
            EntryVisibility::Public
        } else {
            EntryVisibility::Package
        };
        let method = GeneratedMethod {
            kind,
            name: sig.name.to_string(),
            text: method_text,
        };
        let owner = owner.qualified_name();
        match index.get(&owner) {
            Some(&i) => {
                let entry = &mut parsed.entries[i];
                if visibility == EntryVisibility::Public {
                    entry.visibility = EntryVisibility::Public;
                }
                entry.methods.push(method);
            }
            None => {
                index.insert(owner.clone(), parsed.entries.len());
                parsed.entries.push(GeneratedMethodEntry {
                    owner,
                    visibility,
                    methods: vec![method],
                });
            }
        }
    }
    parsed
}

/// Combine previous entries with freshly generated ones.
///
/// Previous entries whose owner is in `regenerated` are superseded, even when
/// the owner produced no fresh entry. Survivors keep their order and come
/// first; fresh entries follow in the order given. Returns the merged entries
/// and how many previous entries were kept.
pub fn merge_entries(
    previous: Vec<GeneratedMethodEntry>,
    regenerated: &BTreeSet<String>,
    fresh: Vec<GeneratedMethodEntry>,
) -> (Vec<GeneratedMethodEntry>, usize) {
    let mut seen = HashSet::new();
    let mut merged: Vec<GeneratedMethodEntry> = previous
        .into_iter()
        .filter(|e| !regenerated.contains(&e.owner))
        .filter(|e| seen.insert(e.owner.clone()))
        .collect();
    let kept = merged.len();
    merged.extend(fresh.into_iter().filter(|e| seen.insert(e.owner.clone())));
    (merged, kept)
}

fn collect_imports(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|l| l.trim().strip_prefix("import "))
        .filter(|l| !l.starts_with("static "))
        .filter_map(|l| l.trim_end_matches(';').trim().rsplit_once('.'))
        .map(|(pkg, simple)| (simple.to_string(), pkg.to_string()))
        .collect()
}

/// Split a single-line static method into its parts.
///
/// Expects the layout the generator emits:
/// `[public ]static <Vars> Ret name(params) { body }`.
fn parse_signature(line: &str) -> Option<Signature<'_>> {
    let (public, rest) = match line.strip_prefix("public ") {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let rest = rest.strip_prefix("static ")?.trim_start();
    if !rest.ends_with('}') {
        return None;
    }

    let (type_vars, rest) = if rest.starts_with('<') {
        let close = matching_angle(rest)?;
        let vars = split_type_params(&rest[1..close])
            .into_iter()
            .map(str::to_string)
            .collect();
        (vars, rest[close + 1..].trim_start())
    } else {
        (Vec::new(), rest)
    };

    let open = find_at_depth_zero(rest, '(')?;
    let head = rest[..open].trim_end();
    let (return_type, name) = head.rsplit_once(' ')?;
    let after = &rest[open + 1..];
    let close = after.find(')')?;

    Some(Signature {
        public,
        type_vars,
        return_type: return_type.trim(),
        name: name.trim(),
        params: after[..close].trim(),
    })
}

fn matching_angle(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn find_at_depth_zero(s: &str, target: char) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Identify a method as a coercion or type-equality witness and recover its owner.
fn attribute(
    family: &EncodingFamily,
    scope: &NameScope<'_>,
    sig: &Signature<'_>,
) -> Option<(MethodKind, DeclaredType)> {
    let ret = parse_type_expr(sig.return_type)?.to_type_ref(scope);
    let ret = ret.as_declared()?;

    if family.is_type_eq(ret) {
        if !sig.params.is_empty() || ret.args.len() != 2 {
            return None;
        }
        family.uncurry(&ret.args[0])?;
        let owner = ret.args[1].as_declared()?;
        return Some((MethodKind::TypeEq, owner.erasure()));
    }

    // `final <type> <name>`
    let param = sig.params.strip_prefix("final ").unwrap_or(sig.params);
    if split_type_params(param).len() != 1 {
        return None;
    }
    let (param_type, _) = param.rsplit_once(' ')?;
    let param_type = parse_type_expr(param_type)?.to_type_ref(scope);
    let (_, args) = family.uncurry(&param_type)?;
    if args.len() != ret.args.len() {
        return None;
    }
    Some((MethodKind::Coerce, ret.erasure()))
}
