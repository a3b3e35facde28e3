//! Bartender - Mod and fastflag manager for Sober
//!
//! Main entry point for the command-line application.
//!
//! # Execution Flow
//!
//! 1. Parse the command line
//! 2. Load settings: defaults → `Bartender.yaml` → `BARTENDER_*` environment
//! 3. Initialize logging → `<log_dir>/bartender.<date>`
//! 4. Create StateManager and AppController
//! 5. Run the command, print its output to stdout
//!
//! Errors are printed to stderr and turn into a non-zero exit code.

use anyhow::{Context, Result, anyhow};
use bartender::ui::{Cli, Command, FlagsCommand, ModsCommand, SettingsCommand};
use bartender::{APP_NAME, AppController, ConfigManager, Settings, StateManager, VERSION};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = bartender::ui::cli::parse();

    match run(cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String> {
    let config_dir = cli
        .global
        .config_dir
        .clone()
        .unwrap_or_else(ConfigManager::default_config_dir);
    let config_manager = ConfigManager::new(&config_dir)?;
    let settings = config_manager.load_settings()?;

    // Held until the end of the command so buffered log lines are flushed
    let _guard = bartender::logging::setup_logging(
        &settings.log_dir,
        "bartender",
        cli.global.debug || settings.debug_mode,
        cli.global.verbose,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let result = match cli.command {
        Command::Settings(command) => run_settings(&command, &config_manager, &settings),
        Command::Mods(command) => run_mods(command, &controller_for(settings)),
        Command::Flags(command) => run_flags(command, &mut controller_for(settings)),
        Command::Status => run_status(&mut controller_for(settings)),
    };

    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    result
}

fn controller_for(settings: Settings) -> AppController {
    AppController::new(settings, Arc::new(StateManager::new()))
}

fn run_mods(command: ModsCommand, controller: &AppController) -> Result<String> {
    match command {
        ModsCommand::List => {
            let mods = controller.refresh_mods()?;
            if mods.is_empty() {
                return Ok(format!(
                    "No mods staged in {}",
                    controller.settings().mods_dir
                ));
            }

            let lines: Vec<String> = mods
                .iter()
                .map(|entry| {
                    let marker = if entry.installed { "installed" } else { "staged" };
                    format!("{:<10} {}", marker, entry.name)
                })
                .collect();
            Ok(lines.join("\n"))
        }
        ModsCommand::Import { archive } => controller.import_mod(&archive),
        ModsCommand::Install { name } => controller.install_mod(&name),
        ModsCommand::Cleanup => controller.cleanup_mods(),
        ModsCommand::VerifyCase => controller.verify_case(),
    }
}

fn run_flags(command: FlagsCommand, controller: &mut AppController) -> Result<String> {
    controller.load_flags()?;

    match command {
        FlagsCommand::List { search } => {
            let rows = controller.search_flags(search.as_deref().unwrap_or(""));
            if rows.is_empty() {
                return Ok("No fastflags found".to_string());
            }

            let lines: Vec<String> = rows
                .iter()
                .map(|(key, value)| format!("{} = {}", key, value))
                .collect();
            Ok(lines.join("\n"))
        }
        FlagsCommand::Get { key } => controller
            .get_flag(&key)
            .map(|value| value.to_string())
            .ok_or_else(|| anyhow!("no flag named {}", key)),
        FlagsCommand::Set { key, value } => {
            let message = controller.set_flag(&key, &value)?;
            save_after(controller, message)
        }
        FlagsCommand::Remove { key } => {
            let message = controller.remove_flag(&key)?;
            save_after(controller, message)
        }
        FlagsCommand::Import { file, merge } => {
            let message = controller.import_flags(&file, merge)?;
            save_after(controller, message)
        }
        FlagsCommand::Export { file } => controller.export_flags(&file),
    }
}

fn save_after(controller: &mut AppController, message: String) -> Result<String> {
    let saved = controller.save_flags()?;
    Ok(format!("{}\n{}", message, saved))
}

fn run_status(controller: &mut AppController) -> Result<String> {
    let installation = controller.check_sober();
    let mods = controller.refresh_mods()?;
    let installed = mods.iter().filter(|entry| entry.installed).count();
    controller.load_flags()?;

    let settings = controller.settings();
    Ok(format!(
        "Sober:     {}\n\
         Overlay:   {}\n\
         Mods:      {} staged, {} installed ({})\n\
         Fastflags: {} in {}",
        installation.status_message(),
        settings.overlay_dir,
        mods.len(),
        installed,
        settings.mods_dir,
        controller.flags().len(),
        settings.flags_config_path
    ))
}

fn run_settings(
    command: &SettingsCommand,
    config_manager: &ConfigManager,
    settings: &Settings,
) -> Result<String> {
    match command {
        SettingsCommand::Show => {
            let yaml = serde_yaml_ng::to_string(settings).context("Failed to serialize settings")?;
            Ok(format!(
                "# {}\n{}",
                config_manager.settings_path(),
                yaml.trim_end()
            ))
        }
        SettingsCommand::Init => {
            config_manager.save_settings(settings)?;
            Ok(format!("Wrote {}", config_manager.settings_path()))
        }
    }
}
