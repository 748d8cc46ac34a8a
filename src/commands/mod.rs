//! Command implementations
//!
//! Each command is a module with an execute function that takes already
//! validated options and carries out the operation on the filesystem.

pub mod cleanup;
pub mod info;
pub mod rename;
pub mod run;

// Re-export execute functions for convenience
pub use cleanup::execute as cleanup;
pub use info::execute as info;
pub use rename::execute as rename;
pub use run::execute as run;

pub use cleanup::CleanupSummary;
pub use info::TagInventory;
pub use rename::RenameSummary;
pub use run::{RunOptions, RunSummary, Templates};
