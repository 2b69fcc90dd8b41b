//! Batch Reports - Per-file outcomes and summaries

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

use crate::filenames::RenameOutcome;
use crate::templates::Change;
use crate::validation::Violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Fix,
    Check,
    Format,
}

/// What happened to one template file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Unchanged,
    Rewritten { changes: Vec<Change> },
    Reformatted,
    /// Removed because its content could not be parsed.
    Deleted { reason: String },
    Valid,
    Invalid {
        violations: Vec<Violation>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Failed { error: String },
}

impl FileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Rewritten { .. } => "rewritten",
            Self::Reformatted => "reformatted",
            Self::Deleted { .. } => "deleted",
            Self::Valid => "valid",
            Self::Invalid { .. } => "invalid",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unchanged: usize,
    pub rewritten: usize,
    pub reformatted: usize,
    pub deleted: usize,
    pub valid: usize,
    pub invalid: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub mode: Mode,
    pub directory: PathBuf,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub renames: Vec<RenameOutcome>,
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn new(mode: Mode, directory: PathBuf) -> Self {
        Self {
            mode,
            directory,
            generated_at: Utc::now(),
            renames: vec![],
            files: vec![],
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary { total: self.files.len(), ..Summary::default() };
        for file in &self.files {
            match file.outcome {
                FileOutcome::Unchanged => summary.unchanged += 1,
                FileOutcome::Rewritten { .. } => summary.rewritten += 1,
                FileOutcome::Reformatted => summary.reformatted += 1,
                FileOutcome::Deleted { .. } => summary.deleted += 1,
                FileOutcome::Valid => summary.valid += 1,
                FileOutcome::Invalid { .. } => summary.invalid += 1,
                FileOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Only invalid templates fail a batch.
    pub fn is_success(&self) -> bool {
        self.summary().invalid == 0
    }
}

/// Serialized form of a report, with its aggregate counts.
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a BatchReport,
    summary: Summary,
}

/// Pretty-printed JSON rendering of a report, including the summary.
pub fn to_json(report: &BatchReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport { report, summary: report.summary() })
}

const RULE: &str = "==================================================";

/// Human-readable rendering of a report.
pub fn render(report: &BatchReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &BatchReport) -> std::fmt::Result {
    for rename in &report.renames {
        match rename {
            RenameOutcome::Renamed { from, to } => writeln!(out, "[renamed] {} -> {}", from, to)?,
            RenameOutcome::DuplicateRemoved { removed, kept } => {
                writeln!(out, "[duplicate] removed {} (kept {})", removed, kept)?
            }
            RenameOutcome::Failed { file, error } => writeln!(out, "[failed] {}: {}", file, error)?,
        }
    }

    if report.files.is_empty() {
        writeln!(out, "No JSON template files found in {}", report.directory.display())?;
        return Ok(());
    }

    for file in &report.files {
        writeln!(out, "[{}] {}", file.outcome.label(), file.file_name)?;
        write_details(out, &file.outcome, "    - ")?;
    }

    let summary = report.summary();
    writeln!(out)?;
    match report.mode {
        Mode::Check => write_check_summary(out, report, &summary)?,
        Mode::Fix => writeln!(
            out,
            "Processed {} templates: {} rewritten, {} unchanged, {} deleted, {} failed",
            summary.total, summary.rewritten, summary.unchanged, summary.deleted, summary.failed
        )?,
        Mode::Format => writeln!(
            out,
            "Formatted {} templates: {} reformatted, {} unchanged, {} failed",
            summary.total, summary.reformatted, summary.unchanged, summary.failed
        )?,
    }
    Ok(())
}

fn write_details(out: &mut String, outcome: &FileOutcome, prefix: &str) -> std::fmt::Result {
    match outcome {
        FileOutcome::Rewritten { changes } => {
            for change in changes {
                writeln!(out, "{}{}", prefix, change)?;
            }
        }
        FileOutcome::Invalid { violations, .. } => {
            for violation in violations {
                writeln!(out, "{}{}", prefix, violation)?;
            }
        }
        FileOutcome::Deleted { reason } => writeln!(out, "{}{}", prefix, reason)?,
        FileOutcome::Failed { error } => writeln!(out, "{}{}", prefix, error)?,
        FileOutcome::Unchanged | FileOutcome::Reformatted | FileOutcome::Valid => {}
    }
    Ok(())
}

fn write_check_summary(out: &mut String, report: &BatchReport, summary: &Summary) -> std::fmt::Result {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "VALIDATION SUMMARY")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Valid templates: {}", summary.valid)?;
    writeln!(out, "Invalid templates: {}", summary.invalid)?;
    writeln!(out, "Total templates: {}", summary.total)?;

    if summary.invalid == 0 {
        writeln!(out, "\nAll templates are valid.")?;
        return Ok(());
    }

    writeln!(out, "\nInvalid templates:")?;
    let invalid = report
        .files
        .iter()
        .filter(|file| matches!(file.outcome, FileOutcome::Invalid { .. }));
    for (i, file) in invalid.enumerate() {
        writeln!(out, "{}. {}", i + 1, file.file_name)?;
        write_details(out, &file.outcome, "   * ")?;
    }
    Ok(())
}
