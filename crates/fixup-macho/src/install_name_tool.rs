use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::trace;

use fixup_fs::Simplified;

use crate::{Error, LoadCommandWriter};

/// The edits to apply to a single binary in one `install_name_tool` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallNameEdits {
    /// The new install name (`-id`).
    pub id: Option<String>,
    /// Rpaths to remove (`-delete_rpath`).
    pub delete_rpaths: Vec<String>,
    /// Rpaths to append (`-add_rpath`).
    pub add_rpaths: Vec<String>,
    /// Dependency references to replace, as `(old, new)` pairs (`-change`).
    pub changes: Vec<(String, String)>,
}

impl InstallNameEdits {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.delete_rpaths.is_empty()
            && self.add_rpaths.is_empty()
            && self.changes.is_empty()
    }

    /// The number of individual edits in the batch.
    pub fn len(&self) -> usize {
        usize::from(self.id.is_some())
            + self.delete_rpaths.len()
            + self.add_rpaths.len()
            + self.changes.len()
    }

    /// The `install_name_tool` arguments for this batch, without the target path.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(2 * self.len());
        if let Some(id) = &self.id {
            args.push("-id".to_string());
            args.push(id.clone());
        }
        for rpath in &self.delete_rpaths {
            args.push("-delete_rpath".to_string());
            args.push(rpath.clone());
        }
        for rpath in &self.add_rpaths {
            args.push("-add_rpath".to_string());
            args.push(rpath.clone());
        }
        for (old, new) in &self.changes {
            args.push("-change".to_string());
            args.push(old.clone());
            args.push(new.clone());
        }
        args
    }
}

/// Rewrites load commands with `install_name_tool`.
#[derive(Debug, Clone)]
pub struct InstallNameTool {
    program: PathBuf,
    adhoc_sign: bool,
}

impl InstallNameTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            adhoc_sign: false,
        }
    }

    /// Re-sign every rewritten binary with an ad-hoc signature.
    ///
    /// Modifying a binary invalidates its existing signature, which prevents it from loading on
    /// Apple Silicon.
    #[must_use]
    pub fn with_adhoc_sign(mut self, adhoc_sign: bool) -> Self {
        self.adhoc_sign = adhoc_sign;
        self
    }
}

impl Default for InstallNameTool {
    fn default() -> Self {
        Self::new("install_name_tool")
    }
}

impl LoadCommandWriter for InstallNameTool {
    fn write(&self, path: &Path, edits: &InstallNameEdits) -> Result<(), Error> {
        if edits.is_empty() {
            return Ok(());
        }

        let args = edits.to_args();
        trace!(
            "Running `install_name_tool {}` on {}",
            args.join(" "),
            path.simplified_display()
        );

        let output = Command::new(&self.program)
            .args(&args)
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

        if self.adhoc_sign {
            sign_adhoc(path)?;
        }

        Ok(())
    }
}

/// Apply ad-hoc code signing to a binary.
///
/// This forcefully replaces any existing signature with an ad-hoc signature.
fn sign_adhoc(path: &Path) -> Result<(), Error> {
    trace!("Applying ad-hoc code signature to {}", path.simplified_display());

    let output = Command::new("codesign")
        .args(["--force", "--sign", "-"])
        .arg(path)
        .output()
        .map_err(|err| Error::Spawn {
            tool: "codesign".to_string(),
            path: path.to_path_buf(),
            err,
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::CodesignFailed {
            path: path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
