use anyhow::{bail, Result};
use clap::Parser;
use hktgen_core::{CollectingSink, MemoryArtifactStore, TracingSink};
use std::path::PathBuf;
use std::sync::Arc;

use super::output::print_report;
use super::{load_round, GlobalOpts};

#[derive(Parser, Debug)]
#[command(about = "Validate candidate declarations without writing anything")]
pub struct CheckCmd {
    /// Candidate manifest (JSON)
    pub manifest: PathBuf,
}

impl CheckCmd {
    pub fn execute(&self, opts: &GlobalOpts) -> Result<()> {
        let (manifest, pipeline) =
            load_round(&self.manifest, opts, Arc::new(MemoryArtifactStore::new()))?;
        // JSON reports carry their diagnostics; the log gets them as they arrive.
        let sink = CollectingSink::new();
        let report = if opts.json {
            pipeline.check(&manifest.declarations, &TracingSink)
        } else {
            pipeline.check(&manifest.declarations, &sink)
        };

        print_report("check", &report, &sink.diagnostics(), opts)?;
        if !report.is_success() {
            bail!(
                "{} declaration(s) failed validation",
                report.failures.len()
            );
        }
        Ok(())
    }
}
