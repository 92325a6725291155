//! Operating-system specific behavior, selected once per run.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use crate::{BundleContext, BundledPath, Classification, Classifier, Edits, Error, ObjectMetadata};

pub use darwin::{DarwinPlatform, rule_table};

mod darwin;

/// The hints available when resolving a dependency reference to a file.
#[derive(Debug, Clone, Copy)]
pub struct SearchHints<'a> {
    /// The object containing the reference.
    pub referrer: &'a Path,
    /// The referrer's own search hints.
    pub referrer_hints: &'a [String],
    /// The main executable's search hints.
    pub executable_hints: &'a [String],
}

/// The capabilities the bundle fixer needs from an operating system.
pub trait Platform: Send + Sync {
    fn context(&self) -> &BundleContext;

    /// The path to the main executable of the bundle.
    fn executable(&self) -> PathBuf;

    /// The directory that bundled paths are relative to.
    fn library_root(&self) -> PathBuf;

    /// Returns `true` if `path` is a loadable binary object.
    fn is_binary(&self, path: &Path) -> Result<bool, Error>;

    /// Read the load-time metadata of a binary object.
    fn inspect(&self, path: &Path) -> Result<ObjectMetadata, Error>;

    fn classifier(&self) -> &Classifier;

    fn classify(&self, reference: &str) -> Result<Classification, Error> {
        self.classifier().classify(reference)
    }

    /// The absolute location of a bundled path.
    fn bundled_location(&self, path: &BundledPath) -> PathBuf {
        path.join_to(&self.library_root())
    }

    /// Find the file that a dependency reference refers to.
    fn resolve_reference_path(
        &self,
        reference: &str,
        hints: SearchHints<'_>,
    ) -> Result<PathBuf, Error>;

    /// Place the dependency at `source` into the bundle at `target`.
    fn materialize(&self, source: &Path, target: &Path) -> Result<crate::Materialized, Error>;

    /// The reference to use for an object at `relative` to the library root.
    fn canonical_reference(&self, relative: &Path) -> String;

    /// The search hint that lets an object at `relative_to_root` (the path from the object's
    /// directory to the library root) find the library root.
    fn loader_hint(&self, relative_to_root: &Path) -> String;

    /// Returns `true` if two search hints are equivalent.
    fn same_hint(&self, left: &str, right: &str) -> bool {
        left.trim_end_matches('/') == right.trim_end_matches('/')
    }

    /// Returns `true` if absolute references of the object at `path` are left unresolved.
    fn is_allowed_unresolved(&self, path: &Path) -> bool;

    /// Apply a batch of edits to the object at `path`.
    fn rewrite(&self, path: &Path, edits: &Edits) -> Result<(), Error>;
}

/// How Mach-O load commands are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ReaderKind {
    /// Parse the output of `otool -l`.
    #[default]
    Otool,
    /// Parse the binaries in-process.
    Native,
}

/// Options shared by all backends.
#[derive(Debug, Clone)]
pub struct PlatformOptions {
    pub reader: ReaderKind,
    /// Path to `otool`, if not the one on `PATH`.
    pub otool: Option<PathBuf>,
    /// Path to `install_name_tool`, if not the one on `PATH`.
    pub install_name_tool: Option<PathBuf>,
    pub adhoc_sign: bool,
    /// Framework name prefixes that may be referenced from outside the build trees.
    pub allow_frameworks: Vec<String>,
    /// Binaries whose absolute references are left unresolved, matched against their path.
    pub allow_unresolved: Vec<String>,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        Self {
            reader: ReaderKind::default(),
            otool: None,
            install_name_tool: None,
            adhoc_sign: false,
            allow_frameworks: vec!["Qt".to_string()],
            allow_unresolved: vec!["libqsqlpsql".to_string(), "libqsqlmysql".to_string()],
        }
    }
}

/// The operating systems that bundles are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Backend {
    Darwin,
    Linux,
    Windows,
}

impl Backend {
    /// The backend for the current operating system.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Darwin
        } else {
            Self::Linux
        }
    }

    /// Create the platform for this backend.
    ///
    /// Only Darwin is supported; the other backends fail.
    pub fn platform(
        self,
        context: BundleContext,
        options: &PlatformOptions,
    ) -> Result<Box<dyn Platform>, Error> {
        match self {
            Self::Darwin => Ok(Box::new(DarwinPlatform::new(context, options)?)),
            Self::Linux | Self::Windows => Err(Error::UnsupportedPlatform {
                platform: self.as_str(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
