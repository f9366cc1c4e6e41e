use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hktgen_core::MemoryArtifactStore;
use std::path::PathBuf;
use std::sync::Arc;

use super::{load_round, GlobalOpts};

#[derive(Parser, Debug)]
#[command(about = "Show the effective configuration of one declaration")]
pub struct ConfigCmd {
    /// Candidate manifest (JSON)
    pub manifest: PathBuf,

    /// Qualified name of the declaration, e.g. com.example.Pair
    pub declaration: String,
}

impl ConfigCmd {
    pub fn execute(&self, opts: &GlobalOpts) -> Result<()> {
        let (manifest, pipeline) =
            load_round(&self.manifest, opts, Arc::new(MemoryArtifactStore::new()))?;
        let decl = manifest
            .find(&self.declaration)
            .ok_or_else(|| anyhow!("No declaration named {}", self.declaration))?;
        let config = pipeline
            .resolver()
            .resolve(decl)
            .with_context(|| format!("Invalid configuration for {}", self.declaration))?;

        if opts.json {
            println!("{}", serde_json::to_string_pretty(config.as_ref())?);
            return Ok(());
        }

        let simple = decl.simple_name();
        println!("{}", self.declaration);
        println!("  generated in:   {}", config.output_class_name);
        println!("  visibility:     {}", config.visibility);
        println!("  coerce method:  {}", config.coerce_method_name(simple));
        println!(
            "  TypeEq method:  {}",
            config
                .type_eq_method_name(simple)
                .as_deref()
                .unwrap_or("(none)")
        );
        println!("  witness marker: {}", config.witness_marker_name);
        if !config.delegate_to.is_empty() {
            let delegates: Vec<&str> = config.delegate_to.iter().map(String::as_str).collect();
            println!("  delegated to:   {}", delegates.join(", "));
        }
        Ok(())
    }
}
