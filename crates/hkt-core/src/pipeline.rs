//! One generation round over a batch of candidate declarations.
//!
//! Validation runs in parallel; grouping by output file happens once every
//! validation has finished; each output file is then generated on its own
//! task. A failure anywhere stays local: a rejected declaration only loses its
//! own accessor, a file error only loses that file.

use crate::codegen::{output_key, GeneratedFile, Generator, SkipReason};
use crate::config::{ConfigResolver, EffectiveConfig};
use crate::diagnostics::{deliver, Diagnostic, DiagnosticSink};
use crate::store::{ArtifactStore, OutputFileKey};
use crate::validator::{Outcome, ValidatedDeclaration, Validator};
use hktgen_types::{Declaration, EncodingFamily};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A declaration rejected by validation, as reported.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub declaration: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// An output file that could not be generated.
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Summary of one round. Partial success is a normal outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Identities of declarations that passed validation, in input order.
    pub valid: Vec<String>,
    pub generated: Vec<GeneratedFile>,
    pub file_errors: Vec<FileError>,
    pub failures: Vec<FailureReport>,
    pub skipped: Vec<(String, SkipReason)>,
    pub not_applicable: usize,
    /// Diagnostics the sink refused.
    pub undelivered: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.file_errors.is_empty()
    }
}

/// Validates candidates and generates their accessor classes.
pub struct Pipeline {
    family: EncodingFamily,
    resolver: ConfigResolver,
    generator: Generator,
}

impl Pipeline {
    pub fn new(
        family: EncodingFamily,
        defaults: EffectiveConfig,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            generator: Generator::new(family.clone(), store),
            resolver: ConfigResolver::new(defaults),
            family,
        }
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// Validate every candidate, in parallel. Outcomes keep input order.
    pub fn validate_all(&self, decls: &[Declaration]) -> Vec<Outcome> {
        let validator = Validator::new(&self.family, &self.resolver);
        decls.par_iter().map(|d| validator.validate(d)).collect()
    }

    /// Validate only; nothing is read or written.
    pub fn check(&self, decls: &[Declaration], sink: &dyn DiagnosticSink) -> RunReport {
        let (report, _) = self.validate_and_report(decls, sink);
        report
    }

    /// Validate, then regenerate every output file touched by a valid declaration.
    pub fn run(&self, decls: &[Declaration], sink: &dyn DiagnosticSink) -> RunReport {
        let (mut report, valid) = self.validate_and_report(decls, sink);

        let mut groups: BTreeMap<OutputFileKey, Vec<ValidatedDeclaration>> = BTreeMap::new();
        for v in valid {
            groups.entry(output_key(&v)).or_default().push(v);
        }
        debug!(files = groups.len(), "generating output files");

        let groups: Vec<(OutputFileKey, Vec<ValidatedDeclaration>)> = groups.into_iter().collect();
        let results: Vec<_> = groups
            .into_par_iter()
            .map(|(key, decls)| {
                let result = self.generator.generate(&key, &decls);
                (key, result)
            })
            .collect();

        for (key, result) in results {
            match result {
                Ok(file) => {
                    report.skipped.extend(file.skipped.iter().cloned());
                    report.generated.push(file);
                }
                Err(e) => {
                    error!(file = %key, error = %e, "generation failed for output file");
                    report.file_errors.push(FileError {
                        file: key.qualified_name(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            valid = report.valid.len(),
            failed = report.failures.len(),
            files = report.generated.len(),
            file_errors = report.file_errors.len(),
            "generation round complete"
        );
        report
    }

    fn validate_and_report(
        &self,
        decls: &[Declaration],
        sink: &dyn DiagnosticSink,
    ) -> (RunReport, Vec<ValidatedDeclaration>) {
        let mut report = RunReport::default();
        let mut valid = Vec::new();

        for outcome in self.validate_all(decls) {
            match outcome {
                Outcome::NotApplicable => report.not_applicable += 1,
                Outcome::Valid(v) => {
                    report.valid.push(v.id());
                    valid.push(v);
                }
                Outcome::Failed(f) => {
                    report.undelivered += deliver(sink, &f.diagnostics);
                    report.failures.push(FailureReport {
                        declaration: f.declaration.id(),
                        diagnostics: f.diagnostics,
                    });
                }
            }
        }
        if report.undelivered > 0 {
            warn!(
                undelivered = report.undelivered,
                "some diagnostics could not be reported"
            );
        }
        (report, valid)
    }
}
