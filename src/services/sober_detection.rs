//! Sober installation detection.
//!
//! Bartender works without Sober present (mods can still be staged and flags
//! edited), but installing into the overlay only has an effect once Sober's
//! flatpak data exists. Detection looks at three locations from [`Settings`]:
//! - the flatpak data root (`~/.var/app/org.vinegarhq.Sober`)
//! - Sober's `config.json`
//! - the downloaded base assets (needed for case verification)

use crate::models::Settings;

/// What was found of a Sober installation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoberInstallation {
    pub app_dir_found: bool,
    pub config_found: bool,
    pub base_assets_found: bool,
}

impl SoberInstallation {
    pub fn is_installed(&self) -> bool {
        self.app_dir_found
    }

    /// Status bar text describing the installation.
    pub fn status_message(&self) -> &'static str {
        if !self.app_dir_found {
            "Warning: Sober installation not found. Some features may not work correctly."
        } else if !self.config_found {
            "Sober found, but it has not written its config yet. Launch Sober once to create it."
        } else if !self.base_assets_found {
            "Sober found, but game files are not downloaded yet. Case verification is unavailable."
        } else {
            "Ready - Sober installation found"
        }
    }
}

/// Detect Sober using the locations in `settings`.
pub fn detect_sober_installation(settings: &Settings) -> SoberInstallation {
    let installation = SoberInstallation {
        app_dir_found: settings.sober_dir.is_dir(),
        config_found: settings.flags_config_path.is_file(),
        base_assets_found: settings.base_assets_dir.is_dir(),
    };

    if installation.is_installed() {
        tracing::info!(
            "Detected Sober at {} (config: {}, base assets: {})",
            settings.sober_dir,
            installation.config_found,
            installation.base_assets_found
        );
    } else {
        tracing::warn!("Sober not found at {}", settings.sober_dir);
    }

    installation
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    fn test_settings() -> (Settings, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let home = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (Settings::from_home(&home), temp_dir)
    }

    #[test]
    fn test_nothing_installed() {
        let (settings, _temp_dir) = test_settings();
        let installation = detect_sober_installation(&settings);

        assert_eq!(installation, SoberInstallation::default());
        assert!(!installation.is_installed());
        assert!(installation.status_message().starts_with("Warning"));
    }

    #[test]
    fn test_app_dir_without_config() {
        let (settings, _temp_dir) = test_settings();
        fs::create_dir_all(&settings.sober_dir).unwrap();

        let installation = detect_sober_installation(&settings);
        assert!(installation.is_installed());
        assert!(!installation.config_found);
        assert!(installation.status_message().contains("config"));
    }

    #[test]
    fn test_full_installation() {
        let (settings, _temp_dir) = test_settings();
        fs::create_dir_all(settings.flags_config_path.parent().unwrap()).unwrap();
        fs::write(&settings.flags_config_path, "{}").unwrap();
        fs::create_dir_all(&settings.base_assets_dir).unwrap();

        let installation = detect_sober_installation(&settings);
        assert!(installation.config_found);
        assert!(installation.base_assets_found);
        assert_eq!(installation.status_message(), "Ready - Sober installation found");
    }
}
