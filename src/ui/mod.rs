// UI module - interactive terminal shell
//
// This module contains:
// - FileOps: The capability set the menu drives
// - MenuController: The single-threaded command loop
// - RefreshWatcher: Advisory "folder changed" flag fed by filesystem events

pub mod bridge;
pub mod controller;
pub mod watcher;

pub use bridge::FileOps;
pub use controller::{ExitReason, MenuController, MenuOptions};
pub use watcher::RefreshWatcher;
