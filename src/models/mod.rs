//! Data models for the BlendPDF application.
//!
//! This module contains the plain data structures shared by the services:
//! - [`WatchedDirectorySet`]: The intake, archive, output and error locations
//! - [`CandidateFile`]: A PDF discovered in the intake folder
//! - [`Operation`]: The single reversible record kept for undo
//! - [`Settings`]: User preferences loaded from `blendpdf.yaml`
//!
//! # Architecture Note
//!
//! The models carry no behavior beyond small derived accessors. Filesystem
//! work lives in [`crate::services`], undo bookkeeping in [`crate::state`].

pub mod config;
pub mod operation;
pub mod workspace;

pub use config::Settings;
pub use operation::{Operation, OperationKind};
pub use workspace::{CandidateFile, WatchedDirectorySet};
