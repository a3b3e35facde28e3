use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Flatpak application id of the Sober runtime.
pub const SOBER_APP_ID: &str = "org.vinegarhq.Sober";

/// User settings from Bartender.yaml
///
/// Every path Bartender touches lives here so the defaults (which mirror the
/// Sober flatpak layout) can be overridden per machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Staging root: one extracted directory per imported mod
    pub mods_dir: Utf8PathBuf,

    /// Sober's flatpak data root (`~/.var/app/org.vinegarhq.Sober`)
    pub sober_dir: Utf8PathBuf,

    /// Overlay directory Sober serves asset overrides from
    pub overlay_dir: Utf8PathBuf,

    /// Sober's downloaded base assets, used for case verification
    pub base_assets_dir: Utf8PathBuf,

    /// Sober's config.json holding the `fflags` section
    pub flags_config_path: Utf8PathBuf,

    pub log_dir: Utf8PathBuf,

    #[serde(default)]
    pub debug_mode: bool,
}

impl Settings {
    /// Build the default layout rooted at the given home directory.
    pub fn from_home(home: &Utf8Path) -> Self {
        let bartender_dir = home.join(".local").join("Bartender");
        let sober_dir = home.join(".var").join("app").join(SOBER_APP_ID);
        let sober_data = sober_dir.join("data").join("sober");

        Self {
            mods_dir: bartender_dir.join("Mods"),
            overlay_dir: sober_data.join("asset_overlay"),
            base_assets_dir: sober_data.join("assets"),
            flags_config_path: sober_dir.join("config").join("sober").join("config.json"),
            log_dir: bartender_dir.join("logs"),
            sober_dir,
            debug_mode: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_home(&home_dir())
    }
}

/// The user's home directory, falling back to the working directory when it
/// cannot be determined or is not valid UTF-8.
pub fn home_dir() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
