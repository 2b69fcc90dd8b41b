//! Batch Pipeline - Single entry point for directory passes
//!
//! Every file is processed independently. Only directory-level failures stop a
//! batch; per-file errors are recorded in the report.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug_span, info, info_span, warn};

use crate::canonical::encode_document;
use crate::filenames::normalize_filenames;
use crate::report::{BatchReport, FileOutcome, FileReport, Mode};
use crate::templates::{self, file_name_of, parse_template, write_template, TemplateError};
use crate::validation::Validator;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Templates directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to get current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("Failed to list templates in {}: {source}", path.display())]
    ListDir { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixOptions {
    /// Rename `foo_bar.json` to `foo-bar.json` before fixing.
    pub normalize_filenames: bool,
}

/// The pass to run over a template directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Fix(FixOptions),
    Check,
    Format,
}

impl Command {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Fix(_) => Mode::Fix,
            Self::Check => Mode::Check,
            Self::Format => Mode::Format,
        }
    }
}

/// A directory of templates
pub struct TemplateBatch {
    dir: PathBuf,
    validator: Validator,
}

impl TemplateBatch {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            validator: Validator::new(),
        }
    }

    /// Use `dir`, or the current directory when it is absent or empty.
    pub fn resolve(dir: Option<&Path>) -> Result<Self, PipelineError> {
        match dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(Self::new(dir)),
            _ => env::current_dir().map(Self::new).map_err(PipelineError::CurrentDir),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all `*.json` files directly inside the directory, sorted.
    pub fn list_templates(&self) -> Result<Vec<String>, PipelineError> {
        if !self.dir.is_dir() {
            return Err(PipelineError::DirectoryNotFound(self.dir.clone()));
        }
        let list_err = |source| PipelineError::ListDir { path: self.dir.clone(), source };

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(list_err)? {
            let path = entry.map_err(list_err)?.path();
            if path.is_file() && path.extension().map_or(false, |e| e == "json") {
                names.push(file_name_of(&path));
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn run(&self, command: &Command) -> Result<BatchReport, PipelineError> {
        let mode = command.mode();
        let _span = info_span!("batch", ?mode, dir = %self.dir.display()).entered();
        let mut report = BatchReport::new(mode, self.dir.clone());

        let mut names = self.list_templates()?;
        if let Command::Fix(FixOptions { normalize_filenames: true }) = command {
            report.renames = normalize_filenames(&self.dir, &names);
            if !report.renames.is_empty() {
                names = self.list_templates()?;
            }
        }
        info!(templates = names.len(), "processing templates");

        for name in names {
            let outcome = self.process(&self.dir.join(&name), command);
            report.files.push(FileReport { file_name: name, outcome });
        }

        let summary = report.summary();
        info!(?summary, "batch finished");
        Ok(report)
    }

    pub fn process(&self, path: &Path, command: &Command) -> FileOutcome {
        let file_name = file_name_of(path);
        let _span = debug_span!("template", file = %file_name).entered();

        let outcome = match command {
            Command::Fix(_) => fix_file(path),
            Command::Check => {
                let result = self.validator.validate_file(path, &file_name);
                if result.valid {
                    FileOutcome::Valid
                } else {
                    FileOutcome::Invalid { violations: result.violations, detail: result.detail }
                }
            }
            Command::Format => format_file(path),
        };
        info!(file = %file_name, outcome = outcome.label(), "processed");
        outcome
    }
}

/// Process one template file with the default validator.
pub fn process_file(path: &Path, command: &Command) -> FileOutcome {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    TemplateBatch::new(dir).process(path, command)
}

fn fix_file(path: &Path) -> FileOutcome {
    match templates::normalize_file(path) {
        Ok(normalization) if normalization.is_modified() => {
            FileOutcome::Rewritten { changes: normalization.changes }
        }
        Ok(_) => FileOutcome::Unchanged,
        Err(err) if err.is_parse() => match fs::remove_file(path) {
            Ok(()) => {
                warn!(error = %err, "deleted unparseable template");
                FileOutcome::Deleted { reason: err.to_string() }
            }
            Err(remove_err) => {
                warn!(error = %remove_err, "failed to delete unparseable template");
                FileOutcome::Failed { error: format!("{}; delete failed: {}", err, remove_err) }
            }
        },
        Err(err) => {
            warn!(error = %err, "failed to fix template");
            FileOutcome::Failed { error: err.to_string() }
        }
    }
}

fn format_file(path: &Path) -> FileOutcome {
    reformat(path).unwrap_or_else(|err| {
        warn!(error = %err, "failed to format template");
        FileOutcome::Failed { error: err.to_string() }
    })
}

fn reformat(path: &Path) -> Result<FileOutcome, TemplateError> {
    let bytes = fs::read(path)
        .map_err(|source| TemplateError::Read { path: path.to_path_buf(), source })?;
    let doc = parse_template(&bytes, path)?;

    if String::from_utf8_lossy(&bytes).trim() == encode_document(&doc).trim() {
        return Ok(FileOutcome::Unchanged);
    }
    write_template(path, &doc)?;
    Ok(FileOutcome::Reformatted)
}
