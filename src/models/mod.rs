//! Data models for Bartender.
//!
//! - [`AppState`]: what the presentation layer shows (mod list, flag status, status line)
//! - [`Settings`]: every filesystem location Bartender reads or writes, loaded from `Bartender.yaml`
//! - [`FlagValue`] / [`FlagKind`]: a fastflag value and its type tag, with text coercion
//!
//! Settings derive `Serialize`/`Deserialize` for YAML persistence; `AppState` is
//! owned by [`StateManager`](crate::state::StateManager).

pub mod app_state;
pub mod config;
pub mod flag;

pub use app_state::{AppState, FlagStatus, ModEntry};
pub use config::{SOBER_APP_ID, Settings};
pub use flag::{CoercionError, FlagKind, FlagValue};
