//! Candidate manifest: the JSON form of what discovery hands to the generator.
//!
//! ```json
//! {
//!   "encoding": { "namespace": "org.derive4j.hkt" },
//!   "defaults": { "withVisibility": "Same" },
//!   "declarations": [ { "package": "com.example", "name": "Pair", "kind": "class", ... } ]
//! }
//! ```

use anyhow::{Context, Result};
use hktgen_core::{ConfigOverride, EffectiveConfig};
use hktgen_types::{Declaration, EncodingFamily, RawFragment};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Candidate declarations plus run-wide settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateManifest {
    /// Wrapper family symbols; the standard family when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<EncodingFamily>,
    /// Outermost configuration fragment, applied over the built-in defaults.
    #[serde(default)]
    pub defaults: RawFragment,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl CandidateManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn family(&self) -> EncodingFamily {
        self.encoding.clone().unwrap_or_default()
    }

    /// `base` with the manifest's `defaults` fragment applied on top.
    pub fn effective_defaults(&self, base: EffectiveConfig) -> Result<EffectiveConfig> {
        let overrides =
            ConfigOverride::from_fragment(&self.defaults).context("Invalid manifest defaults")?;
        let mut config = base;
        overrides.apply_to(&mut config);
        Ok(config)
    }

    /// Look a declaration up by qualified name.
    pub fn find(&self, id: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.id() == id)
    }
}
