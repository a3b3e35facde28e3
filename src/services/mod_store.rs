use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use thiserror::Error;
use walkdir::WalkDir;

/// Top-level folders Sober serves overrides from.
pub const CONTENT_DIRS: [&str; 2] = ["content", "ExtraContent"];

/// Prefix of the hidden scratch directories used while extracting.
const EXTRACT_PREFIX: &str = ".import-";

/// Errors that can occur while managing mods
#[derive(Error, Debug)]
pub enum ModStoreError {
    #[error("Failed to extract {archive}: {reason}")]
    Extraction { archive: Utf8PathBuf, reason: String },

    #[error("Mod {0} not found")]
    ModNotFound(String),

    #[error("Invalid mod name: {0:?}")]
    InvalidName(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ModStoreError {
    fn io(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        ModStoreError::Io {
            path: path.into(),
            source,
        }
    }

    fn extraction(archive: &Utf8Path, reason: impl ToString) -> Self {
        ModStoreError::Extraction {
            archive: archive.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

fn walk_error(root: &Utf8Path, err: walkdir::Error) -> ModStoreError {
    let path = err
        .path()
        .and_then(Utf8Path::from_path)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    ModStoreError::io(path, source)
}

/// A staged mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mod {
    pub name: String,
    /// Files relative to the staging directory, sorted
    pub files: Vec<Utf8PathBuf>,
    /// Every file is present in the overlay directory
    pub installed: bool,
}

/// Outcome of [`ModStore::import`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub name: String,
    pub files_extracted: usize,
    /// An existing staging copy was replaced
    pub replaced: bool,
    /// The archive has a `content` or `ExtraContent` folder at its root
    pub has_content_dirs: bool,
}

/// Outcome of [`ModStore::cleanup`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

impl CleanupReport {
    pub fn summary(&self) -> String {
        if self.failed == 0 {
            format!("Removed {} overlay entries", self.removed)
        } else {
            format!(
                "Removed {} overlay entries, {} could not be removed",
                self.removed, self.failed
            )
        }
    }
}

/// Synchronizes staged mods with Sober's overlay directory.
///
/// # Layout
///
/// ```text
/// <mods_dir>/
///   SkyboxPack/          staged copy of SkyboxPack.zip
///     content/...
///   .import-XXXX/        scratch directory, only while extracting
///
/// <overlay_dir>/         what Sober reads
///   content/...
/// ```
///
/// The store keeps no bookkeeping of its own: the mod list comes from the
/// staging directory and "installed" is recomputed from the overlay.
#[derive(Debug, Clone)]
pub struct ModStore {
    mods_dir: Utf8PathBuf,
    overlay_dir: Utf8PathBuf,
}

impl ModStore {
    pub fn new(mods_dir: impl Into<Utf8PathBuf>, overlay_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            overlay_dir: overlay_dir.into(),
        }
    }

    pub fn mods_dir(&self) -> &Utf8Path {
        &self.mods_dir
    }

    pub fn overlay_dir(&self) -> &Utf8Path {
        &self.overlay_dir
    }

    /// Extract a zip archive into `<mods_dir>/<archive stem>`.
    ///
    /// The archive is unpacked into a hidden scratch directory first and only
    /// moved into place once extraction succeeded, so a corrupt archive never
    /// clobbers an existing staging copy.
    pub fn import(&self, archive_path: &Utf8Path) -> Result<ImportReport, ModStoreError> {
        let name = archive_path
            .file_stem()
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| ModStoreError::extraction(archive_path, "archive has no file name"))?
            .to_string();
        validate_mod_name(&name)?;

        fs::create_dir_all(&self.mods_dir)
            .map_err(|e| ModStoreError::io(&self.mods_dir, e))?;

        let scratch = tempfile::Builder::new()
            .prefix(EXTRACT_PREFIX)
            .tempdir_in(&self.mods_dir)
            .map_err(|e| ModStoreError::io(&self.mods_dir, e))?;
        let scratch_path = Utf8Path::from_path(scratch.path())
            .ok_or_else(|| ModStoreError::InvalidName(scratch.path().display().to_string()))?
            .to_path_buf();

        let files_extracted = extract_zip(archive_path, &scratch_path)?;
        flatten_wrapper_dir(&scratch_path)?;

        let has_content_dirs = CONTENT_DIRS
            .iter()
            .any(|dir| scratch_path.join(dir).is_dir());
        if !has_content_dirs {
            tracing::warn!(
                "{} has no content or ExtraContent folder; Sober may ignore it",
                archive_path
            );
        }

        let dest = self.mods_dir.join(&name);
        let replaced = dest.exists();
        if replaced {
            tracing::info!("Replacing existing staging copy: {}", dest);
            fs::remove_dir_all(&dest).map_err(|e| ModStoreError::io(&dest, e))?;
        }

        fs::rename(&scratch_path, &dest).map_err(|e| ModStoreError::io(&dest, e))?;
        // `scratch` now points at a path that no longer exists; dropping it is a no-op

        tracing::info!("Imported {} ({} files) into {}", name, files_extracted, dest);

        Ok(ImportReport {
            name,
            files_extracted,
            replaced,
            has_content_dirs,
        })
    }

    /// Copy every staged file of `name` into the overlay directory.
    ///
    /// Relative paths are preserved and existing files are overwritten.
    ///
    /// # Returns
    /// The number of files copied
    pub fn install(&self, name: &str) -> Result<usize, ModStoreError> {
        let staging = self.staging_dir(name)?;

        fs::create_dir_all(&self.overlay_dir)
            .map_err(|e| ModStoreError::io(&self.overlay_dir, e))?;

        let mut copied = 0;
        for relative in self.staged_files(&staging)? {
            let src = staging.join(&relative);
            let dest = self.overlay_dir.join(&relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| ModStoreError::io(parent, e))?;
            }
            fs::copy(&src, &dest).map_err(|e| ModStoreError::io(&dest, e))?;
            tracing::debug!("Copied {} -> {}", src, dest);
            copied += 1;
        }

        tracing::info!("Installed {} ({} files) into {}", name, copied, self.overlay_dir);
        Ok(copied)
    }

    /// Remove everything inside the overlay directory.
    ///
    /// The directory itself stays (it is created if missing). Individual
    /// failures are logged and counted instead of aborting the sweep.
    pub fn cleanup(&self) -> Result<CleanupReport, ModStoreError> {
        fs::create_dir_all(&self.overlay_dir)
            .map_err(|e| ModStoreError::io(&self.overlay_dir, e))?;

        let entries =
            fs::read_dir(&self.overlay_dir).map_err(|e| ModStoreError::io(&self.overlay_dir, e))?;

        let mut report = CleanupReport::default();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read overlay entry: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let result = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };

            match result {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!("Overlay cleanup: {}", report.summary());
        Ok(report)
    }

    /// Names of all staged mods, sorted.
    pub fn list(&self) -> Result<Vec<String>, ModStoreError> {
        if !self.mods_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = self
            .mods_dir
            .read_dir_utf8()
            .map_err(|e| ModStoreError::io(&self.mods_dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModStoreError::io(&self.mods_dir, e))?;
            let name = entry.file_name();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Staged files and installed status of one mod.
    pub fn describe(&self, name: &str) -> Result<Mod, ModStoreError> {
        let staging = self.staging_dir(name)?;
        let files = self.staged_files(&staging)?;
        let installed = self.files_in_overlay(&files);

        Ok(Mod {
            name: name.to_string(),
            files,
            installed,
        })
    }

    /// Whether every staged file of `name` is present in the overlay.
    ///
    /// A mod without files is never reported as installed.
    pub fn is_installed(&self, name: &str) -> Result<bool, ModStoreError> {
        Ok(self.describe(name)?.installed)
    }

    fn files_in_overlay(&self, files: &[Utf8PathBuf]) -> bool {
        !files.is_empty()
            && files
                .iter()
                .all(|relative| self.overlay_dir.join(relative).is_file())
    }

    fn staging_dir(&self, name: &str) -> Result<Utf8PathBuf, ModStoreError> {
        validate_mod_name(name)?;
        let staging = self.mods_dir.join(name);
        if !staging.is_dir() {
            return Err(ModStoreError::ModNotFound(name.to_string()));
        }
        Ok(staging)
    }

    fn staged_files(&self, staging: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ModStoreError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(staging).min_depth(1) {
            let entry = entry.map_err(|e| walk_error(staging, e))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(staging)
                .ok()
                .and_then(Utf8Path::from_path)
                .ok_or_else(|| {
                    ModStoreError::InvalidName(entry.path().display().to_string())
                })?;
            files.push(relative.to_path_buf());
        }

        files.sort();
        Ok(files)
    }
}

/// Mod names become directory names; reject anything that could escape the staging root.
fn validate_mod_name(name: &str) -> Result<(), ModStoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\');

    if invalid {
        Err(ModStoreError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Extract every entry of a zip archive below `dest`.
///
/// Entries whose paths would escape `dest` are skipped.
///
/// # Returns
/// Number of files written
fn extract_zip(archive_path: &Utf8Path, dest: &Utf8Path) -> Result<usize, ModStoreError> {
    let file = fs::File::open(archive_path)
        .map_err(|e| ModStoreError::extraction(archive_path, format!("cannot open: {}", e)))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ModStoreError::extraction(archive_path, format!("invalid or corrupt zip: {}", e)))?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            ModStoreError::extraction(archive_path, format!("cannot read entry {}: {}", i, e))
        })?;

        let Some(entry_path) = entry.enclosed_name() else {
            tracing::warn!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let output_path = dest.as_std_path().join(entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)
                .map_err(|e| ModStoreError::extraction(archive_path, e))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ModStoreError::extraction(archive_path, e))?;
        }
        let mut outfile = fs::File::create(&output_path)
            .map_err(|e| ModStoreError::extraction(archive_path, e))?;
        io::copy(&mut entry, &mut outfile).map_err(|e| {
            ModStoreError::extraction(archive_path, format!("failed to write {}: {}", entry.name(), e))
        })?;
        count += 1;
    }

    tracing::debug!("Extracted {} files from {}", count, archive_path);
    Ok(count)
}

/// If the extracted tree is a single wrapper folder, move its contents up.
///
/// Only a folder that itself holds `content` or `ExtraContent` counts as a
/// wrapper. Any other lone folder is part of the mod's layout and stays.
fn flatten_wrapper_dir(root: &Utf8Path) -> Result<(), ModStoreError> {
    let entries: Vec<_> = root
        .read_dir_utf8()
        .map_err(|e| ModStoreError::io(root, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| ModStoreError::io(root, e))?;

    let [only] = entries.as_slice() else {
        return Ok(());
    };

    let wrapper_name = only.file_name();
    let is_payload = CONTENT_DIRS
        .iter()
        .any(|dir| dir.eq_ignore_ascii_case(wrapper_name));
    if is_payload || !only.path().is_dir() {
        return Ok(());
    }
    let wraps_payload = CONTENT_DIRS
        .iter()
        .any(|dir| only.path().join(dir).is_dir());
    if !wraps_payload {
        return Ok(());
    }

    let wrapper = only.path().to_path_buf();
    tracing::debug!("Flattening wrapper folder {}", wrapper);

    // Rename the wrapper first so a child with the same name can move up
    let parked = root.join(format!("{}wrapper", EXTRACT_PREFIX));
    fs::rename(&wrapper, &parked).map_err(|e| ModStoreError::io(&wrapper, e))?;

    for child in parked.read_dir_utf8().map_err(|e| ModStoreError::io(&parked, e))? {
        let child = child.map_err(|e| ModStoreError::io(&parked, e))?;
        let target = root.join(child.file_name());
        fs::rename(child.path(), &target).map_err(|e| ModStoreError::io(&target, e))?;
    }

    fs::remove_dir(&parked).map_err(|e| ModStoreError::io(&parked, e))?;
    Ok(())
}
