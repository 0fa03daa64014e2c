//! IPC command handlers.
//!
//! Each submodule implements the commands for one category.

pub mod economy;
pub mod sync;
pub mod territory;
