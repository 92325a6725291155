use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use tracing::trace;

use fixup_fs::Simplified;

use crate::{Error, LoadCommandReader, LoadCommands};

static INSTALL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^Load command \d+\n\s+cmd LC_ID_DYLIB\n\s+cmdsize \d+\n\s+name (.+) \(offset \d+\)$",
    )
    .unwrap()
});

static DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^Load command \d+\n\s+cmd (?:LC_LOAD_DYLIB|LC_LOAD_WEAK_DYLIB|LC_REEXPORT_DYLIB|LC_LAZY_LOAD_DYLIB)\n\s+cmdsize \d+\n\s+name (.+) \(offset \d+\)$",
    )
    .unwrap()
});

static RPATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Load command \d+\n\s+cmd LC_RPATH\n\s+cmdsize \d+\n\s+path (.+) \(offset \d+\)$")
        .unwrap()
});

/// Reads load commands by running `otool -l`.
#[derive(Debug, Clone)]
pub struct Otool {
    program: PathBuf,
}

impl Otool {
    /// Use the given `otool` executable instead of the one on `PATH`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Otool {
    fn default() -> Self {
        Self::new("otool")
    }
}

impl LoadCommandReader for Otool {
    fn read(&self, path: &Path) -> Result<LoadCommands, Error> {
        trace!("Running `otool -l` on {}", path.simplified_display());

        let output = Command::new(&self.program)
            .arg("-l")
            .arg(path)
            .output()
            .map_err(|err| Error::Spawn {
                tool: self.program.simplified_display().to_string(),
                path: path.to_path_buf(),
                err,
            })?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.program.simplified_display().to_string(),
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_otool_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extract the install name, dependencies and rpaths from the output of `otool -l`.
///
/// Each list keeps the order of the load commands, with repeated entries dropped.
pub fn parse_otool_output(output: &str) -> LoadCommands {
    // Carriage returns would otherwise end up in the captured names.
    let output = output.replace("\r\n", "\n");

    let install_id = INSTALL_ID
        .captures(&output)
        .map(|captures| captures[1].to_string());
    let dependencies = DEPENDENCY
        .captures_iter(&output)
        .map(|captures| captures[1].to_string())
        .unique()
        .collect();
    let rpaths = RPATH
        .captures_iter(&output)
        .map(|captures| captures[1].to_string())
        .unique()
        .collect();

    LoadCommands {
        install_id,
        dependencies,
        rpaths,
    }
}
