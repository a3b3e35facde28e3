// App Controller - Bridges user commands with services and state
//
// This module contains the AppController which coordinates between:
// - ModStore (staging + overlay synchronization)
// - FlagRepository (Sober's config.json)
// - Case verification and Sober detection
// - StateManager (what the presentation layer shows)
//
// Every action reports back through the status message, success or failure,
// and returns the same text to the caller.

use crate::models::{FlagStatus, FlagValue, ModEntry, Settings};
use crate::services::{
    FlagRepository, ModStore, SoberInstallation, detect_sober_installation, verify_overlay,
};
use crate::state::StateManager;
use anyhow::{Result, anyhow};
use camino::Utf8Path;
use std::sync::Arc;

/// Headless controller for the Mods and Fastflags tabs
///
/// Owns the services and keeps [`StateManager`] in sync with them after
/// every action.
///
/// # Example
/// ```ignore
/// let state_manager = Arc::new(StateManager::new());
/// let mut controller = AppController::new(settings, state_manager);
///
/// controller.check_sober();
/// controller.import_mod(Utf8Path::new("SkyboxPack.zip"))?;
/// controller.load_flags()?;
/// controller.set_flag("FFlagDebugGraphicsPreferVulkan", "true")?;
/// controller.save_flags()?;
/// ```
pub struct AppController {
    settings: Settings,
    mod_store: ModStore,
    flags: FlagRepository,
    state_manager: Arc<StateManager>,
}

impl AppController {
    pub fn new(settings: Settings, state_manager: Arc<StateManager>) -> Self {
        let mod_store = ModStore::new(&settings.mods_dir, &settings.overlay_dir);
        let flags = FlagRepository::new(&settings.flags_config_path);

        tracing::debug!("Controller initialized for {}", settings.overlay_dir);

        Self {
            settings,
            mod_store,
            flags,
            state_manager,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state_manager(&self) -> &Arc<StateManager> {
        &self.state_manager
    }

    pub fn flags(&self) -> &FlagRepository {
        &self.flags
    }

    /// Detect Sober and show the result in the status bar
    pub fn check_sober(&self) -> SoberInstallation {
        let installation = detect_sober_installation(&self.settings);
        self.state_manager.update(|state| {
            state.sober_found = installation.is_installed();
            state.status_message = installation.status_message().to_string();
        });
        installation
    }

    // ---- Mods tab ----

    /// Re-read the staging directory and recompute installed flags
    pub fn refresh_mods(&self) -> Result<Vec<ModEntry>> {
        let names = self
            .mod_store
            .list()
            .map_err(|e| self.fail("Failed to list mods", e))?;

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let installed = self
                .mod_store
                .is_installed(&name)
                .map_err(|e| self.fail("Failed to check installed mods", e))?;
            entries.push(ModEntry { name, installed });
        }

        self.state_manager.set_mods(entries.clone());
        Ok(entries)
    }

    pub fn import_mod(&self, archive: &Utf8Path) -> Result<String> {
        let report = self
            .mod_store
            .import(archive)
            .map_err(|e| self.fail("Failed to import mod", e))?;

        let mut message = format!(
            "Successfully imported mod: {} ({} files)",
            report.name, report.files_extracted
        );
        if report.replaced {
            message.push_str(", replacing the previous copy");
        }
        if !report.has_content_dirs {
            message.push_str(". Warning: no content or ExtraContent folder found");
        }

        self.refresh_mods()?;
        Ok(self.succeed(message))
    }

    pub fn install_mod(&self, name: &str) -> Result<String> {
        let copied = self
            .mod_store
            .install(name)
            .map_err(|e| self.fail("Failed to install mod", e))?;

        self.refresh_mods()?;
        Ok(self.succeed(format!(
            "Mod {} installed successfully ({} files)",
            name, copied
        )))
    }

    /// Remove everything from the overlay directory
    pub fn cleanup_mods(&self) -> Result<String> {
        let report = self
            .mod_store
            .cleanup()
            .map_err(|e| self.fail("Failed to clean up mods", e))?;

        self.refresh_mods()?;
        if report.failed > 0 {
            tracing::warn!("{}", report.summary());
        }
        Ok(self.succeed(format!("Cleanup completed. {}", report.summary())))
    }

    /// Fix overlay casing against Sober's base assets
    pub fn verify_case(&self) -> Result<String> {
        let report = verify_overlay(&self.settings)
            .map_err(|e| self.fail("Case verification failed", e))?;

        for failure in &report.failures {
            tracing::warn!("{}", failure);
        }

        self.refresh_mods()?;
        Ok(self.succeed(report.summary()))
    }

    // ---- Fastflags tab ----

    pub fn load_flags(&mut self) -> Result<String> {
        let count = self
            .flags
            .load()
            .map_err(|e| self.fail("Failed to load fastflags", e))?;

        self.sync_flags();
        Ok(self.succeed(format!(
            "Loaded {} fastflags from {}",
            count,
            self.flags.config_path()
        )))
    }

    /// Filter the flag list; an empty term shows every flag.
    ///
    /// Rows are sorted by flag name.
    pub fn search_flags(&self, term: &str) -> Vec<(String, FlagValue)> {
        self.state_manager.set_search_term(term);

        let mut rows: Vec<(String, FlagValue)> = self
            .flags
            .search(term)
            .iter()
            .filter_map(|key| {
                self.flags
                    .get(key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    pub fn get_flag(&self, key: &str) -> Option<&FlagValue> {
        self.flags.get(key)
    }

    /// Edit (or create) a flag from the text the user typed
    pub fn set_flag(&mut self, key: &str, raw: &str) -> Result<String> {
        let key = key.trim();
        if key.is_empty() {
            return Err(self.fail("Failed to set fastflag", anyhow!("flag name is empty")));
        }

        let value = self
            .flags
            .set_value(key, raw)
            .map_err(|e| self.fail("Failed to set fastflag", e))?;

        self.sync_flags();
        Ok(self.succeed(format!("Set {} = {}", key, value)))
    }

    pub fn remove_flag(&mut self, key: &str) -> Result<String> {
        match self.flags.remove(key) {
            Some(_) => {
                self.sync_flags();
                Ok(self.succeed(format!("Removed {}", key)))
            }
            None => Err(self.fail(
                "Failed to remove fastflag",
                anyhow!("no flag named {}", key),
            )),
        }
    }

    pub fn save_flags(&mut self) -> Result<String> {
        self.flags
            .save()
            .map_err(|e| self.fail("Failed to save fastflags", e))?;

        self.sync_flags();
        Ok(self.succeed(format!(
            "Saved {} fastflags to {}",
            self.flags.len(),
            self.flags.config_path()
        )))
    }

    /// Import flags from a flat JSON file.
    ///
    /// With `merge` the imported keys are layered on top of the current
    /// flags; otherwise they replace them.
    pub fn import_flags(&mut self, path: &Utf8Path, merge: bool) -> Result<String> {
        let result = if merge {
            self.flags.merge_from(path)
        } else {
            self.flags.import_from(path)
        };
        let count = result.map_err(|e| self.fail("Failed to import fastflags", e))?;

        self.sync_flags();
        let verb = if merge { "Merged" } else { "Imported" };
        Ok(self.succeed(format!("{} {} fastflags from {}", verb, count, path)))
    }

    pub fn export_flags(&self, path: &Utf8Path) -> Result<String> {
        self.flags
            .export_to(path)
            .map_err(|e| self.fail("Failed to export fastflags", e))?;

        Ok(self.succeed(format!(
            "Exported {} fastflags to {}",
            self.flags.len(),
            path
        )))
    }

    /// Whether there are edits that `save_flags` would write
    pub fn has_unsaved_flags(&self) -> bool {
        self.flags.status() == FlagStatus::Modified
    }

    fn sync_flags(&self) {
        self.state_manager
            .set_flags(self.flags.status(), self.flags.len());
    }

    fn succeed(&self, message: String) -> String {
        tracing::info!("{}", message);
        self.state_manager.set_status(message.clone());
        message
    }

    fn fail(&self, action: &str, err: impl Into<anyhow::Error>) -> anyhow::Error {
        let err = err.into().context(action.to_string());
        tracing::error!("{:#}", err);
        self.state_manager.set_status(format!("Error: {:#}", err));
        err
    }
}
