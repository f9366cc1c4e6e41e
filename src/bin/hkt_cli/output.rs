//! Output formatting for the hktgen CLI
//!
//! Human-readable and JSON renderings of run reports and errors.

use anyhow::Result;
use hktgen_core::{Diagnostic, FileStatus, RunReport};
use serde::Serialize;

use super::GlobalOpts;

/// Print the outcome of a round. Diagnostics go to stderr in human mode and
/// into the report in JSON mode.
pub fn print_report(
    command: &str,
    report: &RunReport,
    diagnostics: &[Diagnostic],
    opts: &GlobalOpts,
) -> Result<()> {
    if opts.json {
        #[derive(Serialize)]
        struct ReportJson<'a> {
            command: &'a str,
            success: bool,
            #[serde(flatten)]
            report: &'a RunReport,
        }

        let json = ReportJson {
            command,
            success: report.is_success(),
            report,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for diagnostic in diagnostics {
        eprintln!("{}", format_diagnostic(diagnostic));
    }

    for file in &report.generated {
        let status = match file.status {
            FileStatus::Written => "wrote",
            FileStatus::Unchanged => "unchanged",
            FileStatus::NotCreated => "skipped",
        };
        println!(
            "{:>9} {} ({} entries, {} kept)",
            status,
            file.key.relative_path().display(),
            file.entries,
            file.kept
        );
        if opts.verbose && file.dropped > 0 {
            println!("          dropped {} unrecognized method(s)", file.dropped);
        }
    }
    for err in &report.file_errors {
        eprintln!("\x1b[31mfailed\x1b[0m {}: {}", err.file, err.message);
    }
    if opts.verbose {
        for (decl, reason) in &report.skipped {
            println!("  skipped {} ({:?})", decl, reason);
        }
    }

    println!(
        "Summary: {} valid, {} failed, {} not applicable",
        report.valid.len(),
        report.failures.len(),
        report.not_applicable
    );
    Ok(())
}

/// `error[HKT005]: element: first line`, continuation lines indented.
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    let mut lines = diagnostic.message.lines();
    let mut out = format!(
        "\x1b[31merror[{}]\x1b[0m: {}: {}",
        diagnostic.code,
        diagnostic.element,
        lines.next().unwrap_or_default()
    );
    for line in lines {
        out.push_str("\n    ");
        out.push_str(line);
    }
    out
}

pub fn format_error(error: &anyhow::Error, json_output: bool) -> String {
    if json_output {
        #[derive(Serialize)]
        struct ErrorJson {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            cause: Option<String>,
        }

        let err = ErrorJson {
            error: error.to_string(),
            cause: error.chain().nth(1).map(|e| e.to_string()),
        };
        serde_json::to_string_pretty(&err).unwrap_or_else(|_| "{}".to_string())
    } else {
        let mut out = format!("\x1b[31mError:\x1b[0m {}\n", error);
        let mut causes = error.chain().skip(1).peekable();
        if causes.peek().is_some() {
            out.push_str("Caused by:\n");
            for (idx, cause) in causes.enumerate() {
                out.push_str(&format!("  {}: {}\n", idx + 1, cause));
            }
        }
        out
    }
}
