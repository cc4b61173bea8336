//! Keystroke and mouse telemetry. A small daemon counts what you type and how far the mouse
//! travels, the CLI turns those counts into a dashboard, reports, a menu bar title and a typing
//! test.

pub mod cli;
pub mod daemon;
pub mod fs;
pub mod input_api;
pub mod utils;
