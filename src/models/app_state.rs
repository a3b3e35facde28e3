use std::fmt;

/// Lifecycle of the in-memory flag mapping relative to the file on disk.
///
/// Only drives UI affordances (e.g. enabling "Save"); the repository itself
/// behaves the same in every state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlagStatus {
    /// Nothing has been read yet
    #[default]
    Unloaded,
    /// In-memory mapping matches what was just read
    Loaded,
    /// Unsaved edits are pending
    Modified,
    /// In-memory mapping was just written to disk
    Saved,
}

impl FlagStatus {
    pub fn has_unsaved_changes(self) -> bool {
        self == FlagStatus::Modified
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FlagStatus::Unloaded => "not loaded",
            FlagStatus::Loaded => "loaded",
            FlagStatus::Modified => "unsaved changes",
            FlagStatus::Saved => "saved",
        };
        f.write_str(text)
    }
}

/// A row in the mod list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModEntry {
    pub name: String,
    pub installed: bool,
}

/// Single source of truth for what the presentation layer shows.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`].
/// Never mutate it directly - use
/// [`update()`](crate::state::StateManager::update) so change events fire.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    // Mods tab
    pub mods: Vec<ModEntry>,

    // Fastflags tab
    pub flag_status: FlagStatus,
    pub flag_count: usize,
    pub search_term: String,

    // Environment
    pub sober_found: bool,

    // Status bar
    pub status_message: String,
}

impl AppState {
    pub fn installed_mod_count(&self) -> usize {
        self.mods.iter().filter(|entry| entry.installed).count()
    }

    /// Whether the "Save" action should be offered.
    pub fn can_save_flags(&self) -> bool {
        self.flag_status.has_unsaved_changes()
    }

    /// Reset everything except environment detection.
    pub fn reset(&mut self) {
        let sober_found = self.sober_found;
        *self = AppState {
            sober_found,
            ..AppState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = AppState::default();
        assert!(state.mods.is_empty());
        assert_eq!(state.flag_status, FlagStatus::Unloaded);
        assert!(!state.can_save_flags());
        assert!(!state.sober_found);
    }

    #[test]
    fn test_installed_mod_count() {
        let mut state = AppState::default();
        state.mods = vec![
            ModEntry { name: "Sky".to_string(), installed: true },
            ModEntry { name: "Cursor".to_string(), installed: false },
            ModEntry { name: "Fonts".to_string(), installed: true },
        ];

        assert_eq!(state.installed_mod_count(), 2);
    }

    #[test]
    fn test_can_save_only_when_modified() {
        let mut state = AppState::default();
        for status in [FlagStatus::Loaded, FlagStatus::Saved, FlagStatus::Unloaded] {
            state.flag_status = status;
            assert!(!state.can_save_flags());
        }

        state.flag_status = FlagStatus::Modified;
        assert!(state.can_save_flags());
    }

    #[test]
    fn test_reset_keeps_sober_detection() {
        let mut state = AppState::default();
        state.sober_found = true;
        state.flag_count = 12;
        state.status_message = "Saved".to_string();

        state.reset();

        assert!(state.sober_found);
        assert_eq!(state.flag_count, 0);
        assert!(state.status_message.is_empty());
    }
}
