//! Effective code-generation configuration.
//!
//! Every scope on a declaration's chain may attach a partial override. The
//! effective configuration is a left fold of those overrides, outermost
//! first, over the run defaults: a field set further in always wins and an
//! unset field is a no-op.

use crate::errors::ConfigError;
use hktgen_types::{Declaration, RawFragment};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_OUTPUT_CLASS: &str = "Hkt";
pub const DEFAULT_COERCE_TEMPLATE: &str = "as{ClassName}";
pub const DEFAULT_TYPE_EQ_TEMPLATE: &str = "{className}";
pub const DEFAULT_WITNESS_MARKER: &str = "µ";

/// Visibility requested for a declaration's generated accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GenVisibility {
    /// Same visibility as the declaration (public or package-private).
    Same,
    /// Always package-private.
    #[default]
    Package,
    /// No accessor is generated.
    Disabled,
}

impl FromStr for GenVisibility {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "same" => Ok(GenVisibility::Same),
            "package" => Ok(GenVisibility::Package),
            "disabled" => Ok(GenVisibility::Disabled),
            _ => Err(ConfigError::UnknownVisibility(s.to_string())),
        }
    }
}

impl fmt::Display for GenVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenVisibility::Same => "Same",
            GenVisibility::Package => "Package",
            GenVisibility::Disabled => "Disabled",
        };
        write!(f, "{}", s)
    }
}

/// Fully resolved configuration for one declaration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// Simple name of the generated class, placed in the declaration's package.
    pub output_class_name: String,
    pub visibility: GenVisibility,
    /// `{ClassName}` / `{className}` template for the coercion method.
    pub coerce_method_template: String,
    /// Same for the type-equality witness; empty disables the witness.
    pub type_eq_method_template: String,
    /// Marker name suggested in guidance messages.
    pub witness_marker_name: String,
    /// Annotations whose presence hands accessor generation to another tool.
    pub delegate_to: BTreeSet<String>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            output_class_name: DEFAULT_OUTPUT_CLASS.to_string(),
            visibility: GenVisibility::default(),
            coerce_method_template: DEFAULT_COERCE_TEMPLATE.to_string(),
            type_eq_method_template: DEFAULT_TYPE_EQ_TEMPLATE.to_string(),
            witness_marker_name: DEFAULT_WITNESS_MARKER.to_string(),
            delegate_to: BTreeSet::new(),
        }
    }
}

impl EffectiveConfig {
    pub fn coerce_method_name(&self, simple_name: &str) -> String {
        expand_template(&self.coerce_method_template, simple_name)
    }

    /// `None` when type-equality witnesses are turned off.
    pub fn type_eq_method_name(&self, simple_name: &str) -> Option<String> {
        if self.type_eq_method_template.is_empty() {
            None
        } else {
            Some(expand_template(&self.type_eq_method_template, simple_name))
        }
    }

    /// Whether one of the declaration's annotations hands generation elsewhere.
    pub fn is_delegated(&self, decl: &Declaration) -> bool {
        decl.annotations.iter().any(|ann| {
            self.delegate_to
                .iter()
                .any(|d| d == ann || last_segment(d) == last_segment(ann))
        })
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Substitute `{ClassName}` and `{className}` with `simple_name` capitalised
/// and decapitalised respectively.
pub fn expand_template(template: &str, simple_name: &str) -> String {
    template
        .replace("{ClassName}", &capitalize(simple_name))
        .replace("{className}", &decapitalize(simple_name))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Partial configuration attached to one scope. `None` means inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverride {
    pub output_class_name: Option<String>,
    pub visibility: Option<GenVisibility>,
    pub coerce_method_template: Option<String>,
    pub type_eq_method_template: Option<String>,
    pub witness_marker_name: Option<String>,
    pub delegate_to: Option<BTreeSet<String>>,
}

impl ConfigOverride {
    /// Parse a raw fragment. Unknown keys are ignored.
    pub fn from_fragment(fragment: &RawFragment) -> Result<Self, ConfigError> {
        let mut ov = ConfigOverride::default();
        for (key, value) in fragment {
            match key.as_str() {
                "generatedIn" => {
                    let name = string_value(key, value)?;
                    if !is_identifier(&name) {
                        return Err(ConfigError::InvalidClassName(name));
                    }
                    ov.output_class_name = Some(name);
                }
                "withVisibility" => {
                    ov.visibility = Some(string_value(key, value)?.parse()?);
                }
                "coerceMethodName" | "methodNames" => {
                    let template = string_value(key, value)?;
                    if template.is_empty() {
                        return Err(ConfigError::EmptyCoerceTemplate);
                    }
                    ov.coerce_method_template = Some(template);
                }
                "typeEqMethodName" => {
                    ov.type_eq_method_template = Some(string_value(key, value)?);
                }
                "witnessMarkerName" | "witnessTypeName" => {
                    ov.witness_marker_name = Some(string_value(key, value)?);
                }
                "delegateTo" => {
                    ov.delegate_to = Some(delegate_list(value)?);
                }
                other => debug!(key = other, "ignoring unknown configuration key"),
            }
        }
        Ok(ov)
    }

    /// Overwrite every field of `acc` this override sets.
    pub fn apply_to(&self, acc: &mut EffectiveConfig) {
        if let Some(v) = &self.output_class_name {
            acc.output_class_name = v.clone();
        }
        if let Some(v) = self.visibility {
            acc.visibility = v;
        }
        if let Some(v) = &self.coerce_method_template {
            acc.coerce_method_template = v.clone();
        }
        if let Some(v) = &self.type_eq_method_template {
            acc.type_eq_method_template = v.clone();
        }
        if let Some(v) = &self.witness_marker_name {
            acc.witness_marker_name = v.clone();
        }
        if let Some(v) = &self.delegate_to {
            acc.delegate_to = v.clone();
        }
    }
}

fn string_value(key: &str, value: &serde_json::Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::NotAString {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn delegate_list(value: &serde_json::Value) -> Result<BTreeSet<String>, ConfigError> {
    let invalid = || ConfigError::InvalidDelegateList(value.to_string());
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Fold overrides, outermost first, over `defaults`.
pub fn resolve_overrides<'a, I>(defaults: &EffectiveConfig, overrides: I) -> EffectiveConfig
where
    I: IntoIterator<Item = &'a ConfigOverride>,
{
    overrides
        .into_iter()
        .fold(defaults.clone(), |mut acc, ov| {
            ov.apply_to(&mut acc);
            acc
        })
}

/// Resolves and memoizes configuration per declaration identity.
///
/// Resolution is pure, so the cache only ever grows and concurrent
/// validators can share one resolver.
pub struct ConfigResolver {
    defaults: EffectiveConfig,
    cache: RwLock<HashMap<String, Arc<EffectiveConfig>>>,
}

impl ConfigResolver {
    pub fn new(defaults: EffectiveConfig) -> Self {
        Self {
            defaults,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn defaults(&self) -> &EffectiveConfig {
        &self.defaults
    }

    /// Declarations local to a function body are resolved every time: two
    /// of them may share a qualified name while sitting in different scopes.
    pub fn resolve(&self, decl: &Declaration) -> Result<Arc<EffectiveConfig>, ConfigError> {
        if decl.is_locally_scoped() {
            let overrides = scope_overrides(decl)?;
            return Ok(Arc::new(resolve_overrides(&self.defaults, &overrides)));
        }

        let id = decl.id();
        if let Some(hit) = self.cache.read().get(&id) {
            return Ok(Arc::clone(hit));
        }

        let overrides = scope_overrides(decl)?;
        let resolved = Arc::new(resolve_overrides(&self.defaults, &overrides));

        // Another thread may have raced us; both computed the same value.
        let mut cache = self.cache.write();
        let entry = cache.entry(id).or_insert(resolved);
        Ok(Arc::clone(entry))
    }

    /// Number of memoized declarations.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(EffectiveConfig::default())
    }
}

/// Parsed overrides of the declaration's scope chain, outermost first,
/// ending with the declaration's own fragment.
fn scope_overrides(decl: &Declaration) -> Result<Vec<ConfigOverride>, ConfigError> {
    let scoped = decl
        .scopes
        .iter()
        .rev()
        .map(|s| (s.name.as_str(), &s.config))
        .chain(std::iter::once((decl.name.as_str(), &decl.config)));

    let mut overrides = Vec::new();
    for (scope, fragment) in scoped {
        if fragment.is_empty() {
            continue;
        }
        let ov = ConfigOverride::from_fragment(fragment).map_err(|e| ConfigError::InScope {
            scope: scope.to_string(),
            source: Box::new(e),
        })?;
        overrides.push(ov);
    }
    Ok(overrides)
}
