use std::path::Path;

use crate::{Error, InstallNameEdits};

/// The load commands of a binary that govern how its dependencies are found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadCommands {
    /// Install name of this library (`LC_ID_DYLIB`), if present.
    pub install_id: Option<String>,
    /// Dylib dependencies (`LC_LOAD_DYLIB`, `LC_LOAD_WEAK_DYLIB`, etc.), in load order.
    pub dependencies: Vec<String>,
    /// Runtime search paths (`LC_RPATH`), in load order.
    pub rpaths: Vec<String>,
}

/// Reads the [`LoadCommands`] of a binary.
pub trait LoadCommandReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<LoadCommands, Error>;
}

/// Applies a batch of [`InstallNameEdits`] to a binary.
pub trait LoadCommandWriter: Send + Sync {
    fn write(&self, path: &Path, edits: &InstallNameEdits) -> Result<(), Error>;
}
