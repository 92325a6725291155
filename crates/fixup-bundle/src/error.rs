use std::io;
use std::path::PathBuf;

use fixup_fs::{CopyError, Simplified};

use crate::ManifestError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    #[error(transparent)]
    MachO(#[from] fixup_macho::Error),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to start the rewrite thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Dependency `{}` does not exist", path.simplified_display())]
    MissingDependencyFile { path: PathBuf },

    #[error("No classification rule handles the reference `{reference}`")]
    UnhandledReference { reference: String },

    #[error(
        "Prohibited reference to `{reference}`, which is outside of the build trees and the bundle"
    )]
    ProhibitedAbsoluteReference { reference: String },

    #[error("Failed to resolve `{reference}` referenced by `{}`", referrer.simplified_display())]
    UnresolvedDependency { reference: String, referrer: PathBuf },

    #[error(
        "Expected exactly one binary in the bundle named like `{reference}` (referenced by `{}`), found {}",
        object.simplified_display(),
        format_candidates(candidates)
    )]
    AmbiguousOrMissingResolution {
        reference: String,
        object: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error(
        "Unsupported dependency type for `{}` (copying to `{}`): expected a file or a directory",
        dependency.simplified_display(),
        target.simplified_display()
    )]
    UnsupportedDependencyType { dependency: PathBuf, target: PathBuf },

    #[error("Refusing to copy to `{}`, which is outside of the bundle `{}`", target.simplified_display(), bundle.simplified_display())]
    TargetOutsideBundle { target: PathBuf, bundle: PathBuf },

    #[error("Invalid classification rule table: {0}")]
    InvalidRuleTable(String),

    #[error("Bundles cannot be fixed up on {platform} yet")]
    UnsupportedPlatform { platform: &'static str },

    #[error("Failed to process `{}`", path.simplified_display())]
    Object {
        path: PathBuf,
        #[source]
        err: Box<Error>,
    },
}

impl Error {
    /// Attach the binary that was being processed to this error.
    pub(crate) fn with_object(self, path: impl Into<PathBuf>) -> Self {
        Self::Object {
            path: path.into(),
            err: Box::new(self),
        }
    }

    /// The innermost error, skipping any [`Error::Object`] wrappers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Object { err, .. } => err.root(),
            err => err,
        }
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return "none".to_string();
    }
    candidates
        .iter()
        .map(|candidate| format!("`{}`", candidate.simplified_display()))
        .collect::<Vec<_>>()
        .join(", ")
}
