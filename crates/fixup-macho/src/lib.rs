//! Reading and rewriting the load commands of Mach-O binaries.
//!
//! Two readers are provided: [`Otool`], which parses the output of `otool -l`, and [`Native`],
//! which parses the binary directly. Rewrites always go through `install_name_tool`, with every
//! edit for a binary batched into a single invocation.

pub use error::Error;
pub use install_name_tool::{InstallNameEdits, InstallNameTool};
pub use load_commands::{LoadCommandReader, LoadCommandWriter, LoadCommands};
pub use otool::{Otool, parse_otool_output};
pub use parse::{Native, parse_macho_bytes};
pub use probe::{is_macho_file, is_macho_magic};

mod error;
mod install_name_tool;
mod load_commands;
mod otool;
mod parse;
mod probe;
