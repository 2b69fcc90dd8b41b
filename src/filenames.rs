//! Filename Normalization - Underscores become hyphens

use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenameOutcome {
    Renamed { from: String, to: String },
    /// The hyphenated target already existed; the underscore copy was removed.
    DuplicateRemoved { removed: String, kept: String },
    Failed { file: String, error: String },
}

/// The hyphenated file name for `file_name`, if it needs renaming.
pub fn normalized_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".json")?;
    if stem.contains('_') {
        Some(format!("{}.json", stem.replace('_', "-")))
    } else {
        None
    }
}

/// Rename every listed template whose name contains an underscore.
pub fn normalize_filenames(dir: &Path, file_names: &[String]) -> Vec<RenameOutcome> {
    let mut outcomes = Vec::new();

    for file_name in file_names {
        let Some(target) = normalized_name(file_name) else {
            continue;
        };
        let source_path = dir.join(file_name);
        let target_path = dir.join(&target);

        let outcome = if target_path.exists() {
            match fs::remove_file(&source_path) {
                Ok(()) => {
                    tracing::warn!(removed = %file_name, kept = %target, "removed duplicate template");
                    RenameOutcome::DuplicateRemoved { removed: file_name.clone(), kept: target }
                }
                Err(e) => RenameOutcome::Failed { file: file_name.clone(), error: e.to_string() },
            }
        } else {
            match fs::rename(&source_path, &target_path) {
                Ok(()) => {
                    tracing::info!(from = %file_name, to = %target, "renamed template");
                    RenameOutcome::Renamed { from: file_name.clone(), to: target }
                }
                Err(e) => RenameOutcome::Failed { file: file_name.clone(), error: e.to_string() },
            }
        };

        if let RenameOutcome::Failed { file, error } = &outcome {
            tracing::warn!(file = %file, error = %error, "failed to normalize filename");
        }
        outcomes.push(outcome);
    }

    outcomes
}
