use anyhow::{bail, Result};
use clap::Parser;
use hktgen_core::{CollectingSink, FsArtifactStore, TracingSink};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::output::print_report;
use super::{load_round, GlobalOpts};

#[derive(Parser, Debug)]
#[command(about = "Validate candidates and write their accessor classes")]
pub struct GenerateCmd {
    /// Candidate manifest (JSON)
    pub manifest: PathBuf,

    /// Root of the generated source tree
    #[arg(long, short, default_value = "generated")]
    pub out_dir: PathBuf,
}

impl GenerateCmd {
    pub fn execute(&self, opts: &GlobalOpts) -> Result<()> {
        let store = Arc::new(FsArtifactStore::new(&self.out_dir));
        let (manifest, pipeline) = load_round(&self.manifest, opts, store)?;
        info!(
            declarations = manifest.declarations.len(),
            out_dir = %self.out_dir.display(),
            "starting generation round"
        );

        // JSON reports carry their diagnostics; the log gets them as they arrive.
        let sink = CollectingSink::new();
        let report = if opts.json {
            pipeline.run(&manifest.declarations, &TracingSink)
        } else {
            pipeline.run(&manifest.declarations, &sink)
        };

        print_report("generate", &report, &sink.diagnostics(), opts)?;
        if !report.is_success() {
            bail!(
                "{} declaration(s) failed validation, {} file(s) could not be written",
                report.failures.len(),
                report.file_errors.len()
            );
        }
        Ok(())
    }
}
