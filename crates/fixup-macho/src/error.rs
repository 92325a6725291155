use std::io;
use std::path::PathBuf;

use fixup_fs::Simplified;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Failed to parse Mach-O binary `{}`: {message}", path.simplified_display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to run `{tool}` on `{}`", path.simplified_display())]
    Spawn {
        tool: String,
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("`{tool}` failed on `{}`: {stderr}", path.simplified_display())]
    ToolFailed {
        tool: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("Failed to apply an ad-hoc code signature to `{}`: {stderr}", path.simplified_display())]
    CodesignFailed { path: PathBuf, stderr: String },
}
