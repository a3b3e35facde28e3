// UI module - presentation layer
//
// This module contains:
// - AppController: headless controller that drives the services and state
// - cli: clap command-line front end

pub mod cli;
pub mod controller;

pub use cli::{Cli, Command, FlagsCommand, GlobalOptions, ModsCommand, SettingsCommand};
pub use controller::AppController;
