//! Subcommands of the hktgen CLI.

pub mod check;
pub mod config;
pub mod generate;
pub mod output;

use anyhow::Result;
use hktgen::CandidateManifest;
use hktgen_core::{ArtifactStore, EffectiveConfig, GenVisibility, Pipeline};
use std::path::Path;
use std::sync::Arc;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct GlobalOpts {
    pub json: bool,
    pub verbose: bool,
    pub default_visibility: Option<GenVisibility>,
}

impl GlobalOpts {
    /// Built-in defaults, then the command-line override, then the manifest's `defaults`.
    pub fn defaults_for(&self, manifest: &CandidateManifest) -> Result<EffectiveConfig> {
        let mut base = EffectiveConfig::default();
        if let Some(visibility) = self.default_visibility {
            base.visibility = visibility;
        }
        manifest.effective_defaults(base)
    }
}

/// Load a manifest and build the pipeline for one round over it.
pub fn load_round(
    path: &Path,
    opts: &GlobalOpts,
    store: Arc<dyn ArtifactStore>,
) -> Result<(CandidateManifest, Pipeline)> {
    let manifest = CandidateManifest::load(path)?;
    let defaults = opts.defaults_for(&manifest)?;
    let pipeline = Pipeline::new(manifest.family(), defaults, store);
    Ok((manifest, pipeline))
}
