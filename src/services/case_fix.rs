//! Overlay case verification.
//!
//! Mods are often authored on case-insensitive filesystems, so an archive may
//! ship `Content/Textures/Sky.png` where Sober looks for
//! `content/textures/sky.png`. On Linux those are different files and the
//! override silently does nothing.
//!
//! This module scans Sober's base asset tree and renames overlay entries that
//! match a base entry case-insensitively but not exactly.
//!
//! ```text
//! assets/content/textures/sky.png      (base, correct casing)
//! asset_overlay/Content/Textures/...   (overlay, renamed to content/textures/...)
//! ```

use crate::models::Settings;
use crate::services::mod_store::CONTENT_DIRS;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use thiserror::Error;

/// Errors that stop verification before it starts
#[derive(Error, Debug)]
pub enum CaseFixError {
    #[error(
        "Could not find base game files under {0}. Make sure Sober is installed and has downloaded the game files."
    )]
    BaseAssetsMissing(Utf8PathBuf),
}

/// Name tree of a directory: `Some` for subdirectories, `None` for files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirStructure {
    pub entries: BTreeMap<String, Option<DirStructure>>,
}

impl DirStructure {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One rename performed (or attempted) in the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseChange {
    /// Path relative to the verified directory, before the rename
    pub from: Utf8PathBuf,
    /// Path relative to the verified directory, after the rename
    pub to: Utf8PathBuf,
}

/// Outcome of a verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFixReport {
    pub renamed: Vec<CaseChange>,
    pub failures: Vec<String>,
}

impl CaseFixReport {
    pub fn is_clean(&self) -> bool {
        self.renamed.is_empty() && self.failures.is_empty()
    }

    pub fn merge(&mut self, other: CaseFixReport) {
        self.renamed.extend(other.renamed);
        self.failures.extend(other.failures);
    }

    pub fn summary(&self) -> String {
        match (self.renamed.len(), self.failures.len()) {
            (0, 0) => "No issues found. All mod files have correct casing.".to_string(),
            (renamed, 0) => format!("Found and fixed {} case issues.", renamed),
            (renamed, failed) => format!(
                "Fixed {} case issues, {} could not be fixed.",
                renamed, failed
            ),
        }
    }
}

/// Recursively record the names below `directory`.
///
/// Unreadable directories are logged and treated as empty.
pub fn scan_directory(directory: &Utf8Path) -> DirStructure {
    let mut structure = DirStructure::default();

    let entries = match directory.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Could not scan {}: {}", directory, e);
            return structure;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Could not read entry in {}: {}", directory, e);
                continue;
            }
        };

        let child = if entry.path().is_dir() {
            Some(scan_directory(entry.path()))
        } else {
            None
        };
        structure.entries.insert(entry.file_name().to_string(), child);
    }

    structure
}

/// Rename entries below `base_dir` to the casing recorded in `correct`.
///
/// Entries without a case-insensitive counterpart in `correct` are left alone.
pub fn fix_case_issues(base_dir: &Utf8Path, correct: &DirStructure) -> CaseFixReport {
    let mut report = CaseFixReport::default();
    tracing::info!("Starting case verification of {}", base_dir);

    fix_directory(base_dir, base_dir, correct, &mut report);

    tracing::info!("{}: {}", base_dir, report.summary());
    report
}

fn fix_directory(
    root: &Utf8Path,
    current: &Utf8Path,
    correct: &DirStructure,
    report: &mut CaseFixReport,
) {
    let items: HashMap<String, Utf8PathBuf> = match current.read_dir_utf8() {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| (entry.file_name().to_lowercase(), entry.into_path()))
            .collect(),
        Err(e) => {
            let relative = relative_to(root, current);
            tracing::error!("Could not list directory {}: {}", relative, e);
            report
                .failures
                .push(format!("Could not list directory {}: {}", relative, e));
            return;
        }
    };

    for (correct_name, substructure) in &correct.entries {
        let Some(matched) = items.get(&correct_name.to_lowercase()) else {
            continue;
        };

        let mut current_item = matched.clone();
        let matched_name = matched.file_name().unwrap_or_default();

        if matched_name != correct_name {
            let new_path = current.join(correct_name);
            let change = CaseChange {
                from: relative_to(root, matched),
                to: relative_to(root, &new_path),
            };

            match fs::rename(matched, &new_path) {
                Ok(()) => {
                    tracing::warn!("Renamed: {} -> {}", change.from, change.to);
                    report.renamed.push(change);
                    current_item = new_path;
                }
                Err(e) => {
                    tracing::error!("Failed to rename {}: {}", matched_name, e);
                    report
                        .failures
                        .push(format!("Failed to rename {}: {}", change.from, e));
                }
            }
        } else {
            tracing::debug!("{} (correct case)", correct_name);
        }

        if let Some(substructure) = substructure {
            if current_item.is_dir() {
                fix_directory(root, &current_item, substructure, report);
            }
        }
    }
}

fn relative_to(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Verify the `content` and `ExtraContent` folders of the overlay against Sober's base assets.
pub fn verify_overlay(settings: &Settings) -> Result<CaseFixReport, CaseFixError> {
    let base_dirs: Vec<_> = CONTENT_DIRS
        .iter()
        .map(|dir| (settings.base_assets_dir.join(dir), settings.overlay_dir.join(dir)))
        .collect();

    if !base_dirs.iter().any(|(base, _)| base.exists()) {
        return Err(CaseFixError::BaseAssetsMissing(
            settings.base_assets_dir.clone(),
        ));
    }

    let mut report = CaseFixReport::default();
    for (base, overlay) in base_dirs {
        if !base.exists() || !overlay.exists() {
            tracing::debug!("Skipping {} (nothing to compare)", overlay);
            continue;
        }

        tracing::debug!("Scanning base assets: {}", base);
        let structure = scan_directory(&base);
        report.merge(fix_case_issues(&overlay, &structure));
    }

    Ok(report)
}
