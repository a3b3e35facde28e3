// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for the presentation layer.

use crate::models::{AppState, FlagStatus, ModEntry};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events let the presentation layer refresh only what changed
/// instead of polling the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The mod list or an installed flag changed
    ModsRefreshed { total: usize, installed: usize },

    /// Flag status or number of flags changed
    FlagsChanged { status: FlagStatus, count: usize },

    /// The flag search term changed
    SearchChanged { term: String },

    /// Sober detection result changed
    SoberDetected { found: bool },

    /// A new status bar message
    StatusMessage { message: String },

    /// State has been reset
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// # Usage
///
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Get a clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.read(AppState::clone)
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let can_save = state_manager.read(|state| state.can_save_flags());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Emits appropriate events
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    ///
    /// Returns a receiver that will get notified of all future state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.mods != new.mods {
            changes.push(StateChange::ModsRefreshed {
                total: new.mods.len(),
                installed: new.installed_mod_count(),
            });
        }

        if old.flag_status != new.flag_status || old.flag_count != new.flag_count {
            changes.push(StateChange::FlagsChanged {
                status: new.flag_status,
                count: new.flag_count,
            });
        }

        if old.search_term != new.search_term {
            changes.push(StateChange::SearchChanged {
                term: new.search_term.clone(),
            });
        }

        if old.sober_found != new.sober_found {
            changes.push(StateChange::SoberDetected {
                found: new.sober_found,
            });
        }

        if old.status_message != new.status_message {
            changes.push(StateChange::StatusMessage {
                message: new.status_message.clone(),
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Replace the mod list
    pub fn set_mods(&self, mods: Vec<ModEntry>) -> Vec<StateChange> {
        self.update(|state| state.mods = mods)
    }

    /// Record the flag repository's status and size
    pub fn set_flags(&self, status: FlagStatus, count: usize) -> Vec<StateChange> {
        self.update(|state| {
            state.flag_status = status;
            state.flag_count = count;
        })
    }

    pub fn set_search_term(&self, term: impl Into<String>) -> Vec<StateChange> {
        let term = term.into();
        self.update(|state| state.search_term = term)
    }

    pub fn set_sober_found(&self, found: bool) -> Vec<StateChange> {
        self.update(|state| state.sober_found = found)
    }

    /// Show a message in the status bar
    pub fn set_status(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| state.status_message = message)
    }

    /// Reset everything except Sober detection
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(AppState::reset);

        let reset_event = StateChange::StateReset;
        let _ = self.state_tx.send(reset_event.clone());
        changes.push(reset_event);

        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
