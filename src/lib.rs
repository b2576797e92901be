// BlendPDF - watch a folder for scanned PDFs and merge duplex scan pairs
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides the interactive terminal entry point.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use app::App;
pub use config::ConfigManager;
pub use models::{CandidateFile, Operation, OperationKind, Settings, WatchedDirectorySet};
pub use services::{LockManager, LopdfEngine, PdfEngine};
pub use session::Session;
pub use state::OperationTracker;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
