//! Retroplay desktop launcher
//!
//! Parses the command line, builds the session services from config and
//! runs the render loop in a minifb window. The `saves` and `cheats`
//! subcommands inspect a title's files without opening a window.

pub mod cli;
pub mod desktop;
pub mod launch;
