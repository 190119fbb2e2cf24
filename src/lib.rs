//! Toolbox - a local automation toolbox
//!
//! Discovers independent utility tools under a tools root, verifies their
//! declared dependencies, dispatches them as child processes and scaffolds
//! new ones from a template.

pub mod config;
pub mod deps;
pub mod dispatch;
pub mod doctor;
pub mod error;
pub mod lint;
pub mod orchestrator;
pub mod scaffold;
pub mod tools;

pub use error::{Result, ToolboxError};
pub use orchestrator::Toolbox;
