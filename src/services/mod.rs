//! Services module - filesystem logic behind the Mods and Fastflags tabs.
//!
//! The services have no dependency on the presentation layer; every input is
//! an explicit parameter and every failure is a typed error.
//!
//! # Components
//!
//! - [`ModStore`]: imports zip archives into per-mod staging directories,
//!   installs staged mods into Sober's overlay directory, wipes the overlay,
//!   lists staged mods (installed status is derived from the overlay).
//! - [`FlagRepository`]: loads Sober's `config.json`, edits flags with
//!   type-aware coercion, searches keys, saves atomically, imports/exports
//!   flat JSON files.
//! - [`case_fix`]: renames overlay entries to the casing of Sober's base assets.
//! - [`sober_detection`]: reports which parts of a Sober installation exist.
//!
//! # Usage Example
//!
//! ```ignore
//! use bartender::services::{FlagRepository, ModStore};
//!
//! let store = ModStore::new(&settings.mods_dir, &settings.overlay_dir);
//! let report = store.import(Utf8Path::new("SkyboxPack.zip"))?;
//! store.install(&report.name)?;
//!
//! let mut flags = FlagRepository::new(&settings.flags_config_path);
//! flags.load()?;
//! flags.set_value("DFIntTaskSchedulerTargetFps", "144")?;
//! flags.save()?;
//! ```

pub mod case_fix;
pub mod flag_repository;
pub mod mod_store;
pub mod sober_detection;

pub use case_fix::{CaseChange, CaseFixError, CaseFixReport, DirStructure, verify_overlay};
pub use flag_repository::{FLAGS_SECTION, FlagError, FlagMap, FlagRepository, FlagSearch};
pub use mod_store::{CleanupReport, ImportReport, Mod, ModStore, ModStoreError};
pub use sober_detection::{SoberInstallation, detect_sober_installation};
