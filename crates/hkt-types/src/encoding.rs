//! The arity-indexed wrapper family.
//!
//! `__<f, A>` is the primitive arity-1 wrapper; `__N<f, A1..AN>` for N in
//! 2..=9 is structurally `__<__N-1<f, A1..AN-1>, AN>`. Instead of carrying
//! nine hand-written symbols around, the family is a single lookup context
//! built once per run and passed to whoever needs to recognise or construct
//! family members.

use crate::metadata::{DeclaredType, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest arity the family provides a wrapper for.
pub const MAX_ARITY: u8 = 9;

pub const DEFAULT_NAMESPACE: &str = "org.derive4j.hkt";
pub const DEFAULT_BASE_SYMBOL: &str = "__";
pub const DEFAULT_TYPE_EQ_SYMBOL: &str = "TypeEq";

/// Number of type arguments a type constructor binds, in `1..=MAX_ARITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Arity(u8);

impl Arity {
    pub const ONE: Arity = Arity(1);

    pub fn new(n: usize) -> Option<Self> {
        if (1..=MAX_ARITY as usize).contains(&n) {
            Some(Arity(n as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Type parameters of the wrapper itself: the arguments plus the witness slot.
    pub fn type_param_count(self) -> usize {
        self.get() + 1
    }

    pub fn all() -> impl Iterator<Item = Arity> {
        (1..=MAX_ARITY).map(Arity)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejected arity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidArity(pub u8);

impl fmt::Display for InvalidArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arity {} is outside 1..={}", self.0, MAX_ARITY)
    }
}

impl std::error::Error for InvalidArity {}

impl TryFrom<u8> for Arity {
    type Error = InvalidArity;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Arity::new(value as usize).ok_or(InvalidArity(value))
    }
}

impl From<Arity> for u8 {
    fn from(a: Arity) -> u8 {
        a.0
    }
}

/// Resolved references to the wrapper family and its type-equality witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingFamily {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_base_symbol")]
    pub base_symbol: String,
    #[serde(default = "default_type_eq_symbol")]
    pub type_eq_symbol: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_base_symbol() -> String {
    DEFAULT_BASE_SYMBOL.to_string()
}

fn default_type_eq_symbol() -> String {
    DEFAULT_TYPE_EQ_SYMBOL.to_string()
}

impl Default for EncodingFamily {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            base_symbol: default_base_symbol(),
            type_eq_symbol: default_type_eq_symbol(),
        }
    }
}

impl EncodingFamily {
    /// Simple name of the arity-N wrapper (`__`, `__2`, ...).
    pub fn symbol_name(&self, arity: Arity) -> String {
        if arity == Arity::ONE {
            self.base_symbol.clone()
        } else {
            format!("{}{}", self.base_symbol, arity)
        }
    }

    /// Raw reference to the arity-N wrapper.
    pub fn symbol(&self, arity: Arity) -> DeclaredType {
        DeclaredType::new(self.namespace.clone(), self.symbol_name(arity), Vec::new())
    }

    /// Raw reference to the type-equality witness.
    pub fn type_eq(&self) -> DeclaredType {
        DeclaredType::new(self.namespace.clone(), self.type_eq_symbol.clone(), Vec::new())
    }

    pub fn is_type_eq(&self, ty: &DeclaredType) -> bool {
        ty.package == self.namespace && ty.name == self.type_eq_symbol
    }

    /// Arity of `ty` if it names a member of the family.
    pub fn arity_of(&self, ty: &DeclaredType) -> Option<Arity> {
        if ty.package != self.namespace {
            return None;
        }
        let suffix = ty.name.strip_prefix(self.base_symbol.as_str())?;
        if suffix.is_empty() {
            return Some(Arity::ONE);
        }
        // `__1` is not a family member; arity one is spelled without a suffix.
        if suffix.starts_with('0') || suffix == "1" {
            return None;
        }
        let n: usize = suffix.parse().ok()?;
        Arity::new(n)
    }

    pub fn is_family_member(&self, ty: &DeclaredType) -> bool {
        self.arity_of(ty).is_some()
    }

    /// `__N<witness, args..>`. `args` is expected to hold exactly `arity` entries.
    pub fn apply(&self, arity: Arity, witness: TypeRef, args: Vec<TypeRef>) -> DeclaredType {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(witness);
        all.extend(args);
        DeclaredType::new(self.namespace.clone(), self.symbol_name(arity), all)
    }

    /// Fold an N-ary wrapper application into nested arity-1 applications.
    ///
    /// `__3<f, A, B, C>` becomes `__<__<__<f, A>, B>, C>`. Returns `None` when
    /// `ty` is not a family member or carries fewer than two arguments.
    pub fn curry(&self, ty: &DeclaredType) -> Option<TypeRef> {
        self.arity_of(ty)?;
        let mut args = ty.args.iter();
        let witness = args.next()?.clone();
        let first = args.next()?.clone();
        let base = |f: TypeRef, a: TypeRef| -> TypeRef {
            DeclaredType::new(self.namespace.clone(), self.base_symbol.clone(), vec![f, a]).into()
        };
        let mut acc = base(witness, first);
        for arg in args {
            acc = base(acc, arg.clone());
        }
        Some(acc)
    }

    /// Peel nested arity-1 applications back into `(witness, arguments)`.
    ///
    /// The walk is maximal: it stops at the first inner type that is not an
    /// arity-1 application with two arguments.
    pub fn uncurry(&self, ty: &TypeRef) -> Option<(TypeRef, Vec<TypeRef>)> {
        let mut args = Vec::new();
        let mut current = ty;
        while let Some(d) = current.as_declared() {
            if self.arity_of(d) != Some(Arity::ONE) || d.args.len() != 2 {
                break;
            }
            args.push(d.args[1].clone());
            current = &d.args[0];
        }
        if args.is_empty() || args.len() > MAX_ARITY as usize {
            return None;
        }
        args.reverse();
        Some((current.clone(), args))
    }

    /// Render the wrapper shape a declaration with `type_params` must implement.
    ///
    /// The arity suffix follows the parameter count even when that count is
    /// out of range, so the guidance still names what was expected.
    pub fn expected_interface(&self, witness: &str, type_params: &[String]) -> String {
        let suffix = if type_params.len() <= 1 {
            String::new()
        } else {
            type_params.len().to_string()
        };
        let mut args = vec![witness.to_string()];
        args.extend(type_params.iter().cloned());
        format!(
            "{}.{}{}<{}>",
            self.namespace,
            self.base_symbol,
            suffix,
            args.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn witness() -> TypeRef {
        DeclaredType::new("com.example", "Pair.µ", vec![]).into()
    }

    fn vars(n: usize) -> Vec<TypeRef> {
        (0..n).map(|i| TypeRef::var(format!("T{}", i))).collect()
    }

    #[test]
    fn test_arity_bounds() {
        assert!(Arity::new(0).is_none());
        assert_eq!(Arity::new(1), Some(Arity::ONE));
        assert_eq!(Arity::new(9).map(Arity::get), Some(9));
        assert!(Arity::new(10).is_none());
        assert_eq!(Arity::all().count(), 9);
        assert!(Arity::try_from(0u8).is_err());
    }

    #[test]
    fn test_arity_of_symbols() {
        let family = EncodingFamily::default();
        for arity in Arity::all() {
            assert_eq!(family.arity_of(&family.symbol(arity)), Some(arity));
        }
        let bogus = DeclaredType::new(DEFAULT_NAMESPACE, "__1", vec![]);
        assert_eq!(family.arity_of(&bogus), None);
        let too_big = DeclaredType::new(DEFAULT_NAMESPACE, "__10", vec![]);
        assert_eq!(family.arity_of(&too_big), None);
        let elsewhere = DeclaredType::new("com.example", "__", vec![]);
        assert_eq!(family.arity_of(&elsewhere), None);
        assert!(!family.is_family_member(&family.type_eq()));
    }

    #[test]
    fn test_curry_shape() {
        let family = EncodingFamily::default();
        let applied = family.apply(Arity::new(2).unwrap(), witness(), vars(2));
        let curried = family.curry(&applied).unwrap();
        assert_eq!(
            curried.render_in("com.example"),
            "org.derive4j.hkt.__<org.derive4j.hkt.__<Pair.µ, T0>, T1>"
        );
    }

    #[test]
    fn test_curry_uncurry_law_for_every_arity() {
        let family = EncodingFamily::default();
        for arity in Arity::all() {
            let args = vars(arity.get());
            let applied = family.apply(arity, witness(), args.clone());
            let curried = family.curry(&applied).unwrap();

            let mut depth = 0;
            let mut cur = &curried;
            while let Some(d) = cur.as_declared() {
                if family.arity_of(d) != Some(Arity::ONE) {
                    break;
                }
                depth += 1;
                cur = &d.args[0];
            }
            assert_eq!(depth, arity.get());

            let (w, back) = family.uncurry(&curried).unwrap();
            assert_eq!(w, witness());
            assert_eq!(back, args);
        }
    }

    #[test]
    fn test_curry_rejects_raw() {
        let family = EncodingFamily::default();
        assert!(family.curry(&family.symbol(Arity::ONE)).is_none());
        assert!(family.uncurry(&TypeRef::var("A")).is_none());
    }

    #[test]
    fn test_expected_interface() {
        let family = EncodingFamily::default();
        let params = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            family.expected_interface("Pair.µ", &params),
            "org.derive4j.hkt.__2<Pair.µ, A, B>"
        );
        assert_eq!(
            family.expected_interface("Box<?>", &params[..1]),
            "org.derive4j.hkt.__<Box<?>, A>"
        );
    }
}
