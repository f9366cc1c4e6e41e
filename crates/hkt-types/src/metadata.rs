//! Typed views over host declaration metadata.
//!
//! The discovery collaborator hands us plain records; everything here is a
//! closed set of variants so callers match instead of visiting.
//!
//! Type names are split into a package and a dotted nested path so that a
//! witness such as `Pair.µ` can be told apart from a package segment without
//! consulting the host.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw configuration fragment attached to a scope: field name -> raw value.
///
/// Only explicitly set fields are present.
pub type RawFragment = BTreeMap<String, serde_json::Value>;

/// A reference to a type as it appears in a declaration header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// A nominal type, possibly applied to arguments.
    Declared(DeclaredType),
    /// A type variable bound by the enclosing declaration.
    Var { name: String },
    /// An unbounded wildcard (`?`).
    Wildcard,
    /// Anything else (primitives, arrays, bounded wildcards); compared textually.
    Other { repr: String },
}

impl TypeRef {
    pub fn var(name: impl Into<String>) -> Self {
        TypeRef::Var { name: name.into() }
    }

    /// View as a declared (nominal) type.
    pub fn as_declared(&self) -> Option<&DeclaredType> {
        match self {
            TypeRef::Declared(d) => Some(d),
            _ => None,
        }
    }

    /// View as a type variable name.
    pub fn as_type_var(&self) -> Option<&str> {
        match self {
            TypeRef::Var { name } => Some(name),
            _ => None,
        }
    }

    pub fn is_type_var(&self) -> bool {
        matches!(self, TypeRef::Var { .. })
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TypeRef::Wildcard)
    }

    /// Render with names in `package` shown relative to it.
    pub fn render_in(&self, package: &str) -> String {
        match self {
            TypeRef::Declared(d) => d.render_in(package),
            TypeRef::Var { name } => name.clone(),
            TypeRef::Wildcard => "?".to_string(),
            TypeRef::Other { repr } => repr.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_in(""))
    }
}

impl From<DeclaredType> for TypeRef {
    fn from(d: DeclaredType) -> Self {
        TypeRef::Declared(d)
    }
}

/// A nominal type reference: `package` + nested path `name` + arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredType {
    #[serde(default)]
    pub package: String,
    /// Dotted path of simple names inside the package, outermost first.
    pub name: String,
    #[serde(default)]
    pub args: Vec<TypeRef>,
}

impl DeclaredType {
    pub fn new(package: impl Into<String>, name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            args,
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(&self.package, &self.name)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Nested path of the directly enclosing type, if this type is nested.
    pub fn enclosing_name(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(outer, _)| outer)
    }

    pub fn is_raw(&self) -> bool {
        self.args.is_empty()
    }

    pub fn erasure(&self) -> DeclaredType {
        DeclaredType::new(self.package.clone(), self.name.clone(), Vec::new())
    }

    pub fn render_in(&self, package: &str) -> String {
        let base = if self.package == package || self.package.is_empty() {
            self.name.clone()
        } else {
            self.qualified_name()
        };
        if self.args.is_empty() {
            base
        } else {
            let args: Vec<String> = self.args.iter().map(|a| a.render_in(package)).collect();
            format!("{}<{}>", base, args.join(", "))
        }
    }
}

/// Kind of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Class,
    Interface,
    Enum,
    Record,
}

impl DeclKind {
    /// Keyword used when a declaration of this kind lists a supertype interface.
    pub fn implements_keyword(self) -> &'static str {
        match self {
            DeclKind::Interface => "extends",
            _ => "implements",
        }
    }

    /// Member types of these kinds are static without an explicit modifier.
    pub fn is_implicitly_static(self) -> bool {
        matches!(self, DeclKind::Interface | DeclKind::Enum | DeclKind::Record)
    }
}

/// Declared access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    #[default]
    Package,
    Private,
}

/// A type declared directly inside a candidate declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberType {
    /// Simple name.
    pub name: String,
    pub kind: DeclKind,
    #[serde(default)]
    pub visibility: Access,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub type_params: Vec<String>,
}

/// Kind of an enclosing scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Package,
    Type,
    Function,
}

/// One link of the enclosing-scope chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: RawFragment,
    /// Only meaningful for `Type` scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Access>,
}

/// A candidate declaration as produced by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    #[serde(default)]
    pub package: String,
    /// Dotted nested path inside the package (`Outer.Pair`).
    pub name: String,
    pub kind: DeclKind,
    #[serde(default)]
    pub visibility: Access,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub members: Vec<MemberType>,
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Enclosing scopes, nearest first.
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: RawFragment,
}

impl Declaration {
    /// Identity used for memoization, grouping and merge ownership.
    pub fn id(&self) -> String {
        qualify(&self.package, &self.name)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// The declaration applied to its own type variables.
    pub fn self_type(&self) -> DeclaredType {
        DeclaredType::new(
            self.package.clone(),
            self.name.clone(),
            self.type_params.iter().map(TypeRef::var).collect(),
        )
    }

    /// The declaration applied to an unbounded wildcard per parameter.
    pub fn wildcard_type(&self) -> DeclaredType {
        DeclaredType::new(
            self.package.clone(),
            self.name.clone(),
            self.type_params.iter().map(|_| TypeRef::Wildcard).collect(),
        )
    }

    pub fn erasure(&self) -> DeclaredType {
        DeclaredType::new(self.package.clone(), self.name.clone(), Vec::new())
    }

    /// Resolve `ty` as a type nested directly inside this declaration.
    pub fn member_for(&self, ty: &DeclaredType) -> Option<&MemberType> {
        if ty.package != self.package || ty.enclosing_name() != Some(self.name.as_str()) {
            return None;
        }
        let simple = ty.simple_name();
        self.members.iter().find(|m| m.name == simple)
    }

    /// Declared inside a function body somewhere up the chain.
    pub fn is_locally_scoped(&self) -> bool {
        self.scopes.iter().any(|s| s.kind == ScopeKind::Function)
    }

    /// Whether a package-level class in the same package can name this type.
    pub fn is_reachable_from_package(&self) -> bool {
        if self.visibility == Access::Private || self.is_locally_scoped() {
            return false;
        }
        !self
            .scopes
            .iter()
            .any(|s| s.kind == ScopeKind::Type && s.visibility == Some(Access::Private))
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Access::Public
    }
}

pub fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Declaration {
        Declaration {
            package: "com.example".into(),
            name: "Pair".into(),
            kind: DeclKind::Class,
            visibility: Access::Public,
            is_static: false,
            type_params: vec!["A".into(), "B".into()],
            interfaces: vec![],
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
        }
    }

    #[test]
    fn test_member_for_direct_nesting_only() {
        let decl = pair();
        let direct = DeclaredType::new("com.example", "Pair.µ", vec![]);
        assert!(decl.member_for(&direct).is_some());

        let elsewhere = DeclaredType::new("com.example", "Other.µ", vec![]);
        assert!(decl.member_for(&elsewhere).is_none());

        let other_pkg = DeclaredType::new("com.other", "Pair.µ", vec![]);
        assert!(decl.member_for(&other_pkg).is_none());
    }

    #[test]
    fn test_render_relative_to_package() {
        let ty = DeclaredType::new(
            "com.example",
            "Pair",
            vec![
                TypeRef::var("A"),
                DeclaredType::new("java.lang", "String", vec![]).into(),
            ],
        );
        assert_eq!(ty.render_in("com.example"), "Pair<A, java.lang.String>");
        assert_eq!(
            ty.render_in("org.other"),
            "com.example.Pair<A, java.lang.String>"
        );
    }

    #[test]
    fn test_reachability() {
        let mut decl = pair();
        assert!(decl.is_reachable_from_package());

        decl.scopes.push(Scope {
            kind: ScopeKind::Function,
            name: "build".into(),
            config: RawFragment::new(),
            visibility: None,
        });
        assert!(!decl.is_reachable_from_package());
    }

    #[test]
    fn test_type_ref_json_shape() {
        let json = r#"{"kind":"declared","package":"com.example","name":"Pair.µ"}"#;
        let ty: TypeRef = serde_json::from_str(json).unwrap();
        assert_eq!(ty.as_declared().unwrap().simple_name(), "µ");
        assert!(ty.as_declared().unwrap().is_raw());
    }
}
