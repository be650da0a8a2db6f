//! # quadratum-cli
//!
//! Management commands for quadratum form definitions.
//!
//! - `check` runs the definition checks and fails on errors
//! - `validate` applies values to a definition and prints a JSON report
//! - `tags` previews the `contact[tags]` attribution packing for a page URL
//!
//! ```rust
//! use quadratum_cli::command::CommandRegistry;
//! use quadratum_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let cli = registry.build_cli();
//! let names: Vec<&str> = cli.get_subcommands().map(|c| c.get_name()).collect();
//! assert_eq!(names, vec!["check", "validate", "tags"]);
//! ```

// - result_large_err: FormsError is the crate-wide error type
// - module_name_repetitions: re-exports make module-prefixed names redundant
// - unused_async: command handlers keep a uniform async signature
#![allow(clippy::result_large_err)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;

pub use command::{load_settings, CommandRegistry, ManagementCommand};
