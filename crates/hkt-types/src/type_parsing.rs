//! Type string parsing utilities.
//!
//! Generated sources spell types as plain text (`__<__<Pair.µ, A>, B>`); the
//! merge step reads them back through these helpers.

use crate::metadata::{DeclaredType, TypeRef};
use std::collections::BTreeMap;

/// A parsed generic type expression: a (possibly dotted) name plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: String,
    pub args: Vec<TypeExpr>,
}

const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

impl TypeExpr {
    /// Resolve against the names visible in a generated source file.
    ///
    /// A name whose first segment is imported belongs to the import's
    /// package; every other name is a path inside the file's own package,
    /// which is how the generator spells them. Case plays no part: `box` and
    /// `outer.Pair` are legal type names.
    pub fn to_type_ref(&self, scope: &NameScope<'_>) -> TypeRef {
        if self.name == "?" && self.args.is_empty() {
            return TypeRef::Wildcard;
        }
        if self.args.is_empty() && scope.type_vars.iter().any(|v| v == &self.name) {
            return TypeRef::var(self.name.clone());
        }
        if self.args.is_empty() && PRIMITIVES.contains(&self.name.as_str()) {
            return TypeRef::Other {
                repr: self.name.clone(),
            };
        }
        let args: Vec<TypeRef> = self.args.iter().map(|a| a.to_type_ref(scope)).collect();

        let first = self.name.split('.').next().unwrap_or(&self.name);
        if let Some(pkg) = scope.imports.get(first) {
            return DeclaredType::new(pkg.clone(), self.name.clone(), args).into();
        }
        DeclaredType::new(scope.package, self.name.clone(), args).into()
    }
}

/// Names visible inside a generated source file.
#[derive(Debug, Clone, Copy)]
pub struct NameScope<'a> {
    /// Package of the file; unqualified names resolve here.
    pub package: &'a str,
    /// Imported simple name -> its package.
    pub imports: &'a BTreeMap<String, String>,
    /// Type variables bound by the enclosing method.
    pub type_vars: &'a [String],
}

/// Parse a type string such as `TypeEq<__<F, A>, Box<A>>`.
///
/// Returns `None` on unbalanced brackets or empty names.
pub fn parse_type_expr(type_str: &str) -> Option<TypeExpr> {
    let type_str = type_str.trim();
    if type_str.is_empty() {
        return None;
    }

    let (base, args_str) = match type_str.find('<') {
        Some(angle_pos) => (&type_str[..angle_pos], Some(&type_str[angle_pos..])),
        None => (type_str, None),
    };
    let base = base.trim();
    if base.is_empty() || base.contains(['>', ',']) {
        return None;
    }

    let args = match args_str {
        Some(args_str) => parse_type_args(args_str)?,
        None => vec![],
    };

    Some(TypeExpr {
        name: base.to_string(),
        args,
    })
}

/// Parse type arguments string like "<T1, T2, T3>".
fn parse_type_args(args_str: &str) -> Option<Vec<TypeExpr>> {
    let inner = args_str.strip_prefix('<')?.strip_suffix('>')?;
    if inner.trim().is_empty() {
        return Some(vec![]);
    }
    if !balanced(inner) {
        return None;
    }
    split_type_params(inner)
        .into_iter()
        .map(parse_type_expr)
        .collect()
}

fn balanced(s: &str) -> bool {
    let mut depth: i32 = 0;
    for c in s.chars() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split type parameters respecting nested angle brackets.
///
/// Given "A, B<C, D>, E", returns ["A", "B<C, D>", "E"] by tracking bracket depth.
pub fn split_type_params(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                result.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < s.len() {
        result.push(s[start..].trim());
    }

    result
}
