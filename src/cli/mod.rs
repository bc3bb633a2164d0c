//! Command-line interface for image-tagger.
//!
//! This module provides CLI commands for registering attachments, running
//! recognition, draining the job queue and searching by keyword.

mod commands;

pub use commands::{Cli, Commands, run_command};
