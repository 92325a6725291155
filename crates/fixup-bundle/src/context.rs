use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use fixup_fs::Simplified;

use crate::{Error, Manifest};

/// Directories inside the bundle, relative to the shared-library root, that the
/// classification rules place dependencies into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    pub lib_dir: String,
    pub itk_factories_dir: String,
    pub qt_modules_dir: String,
    pub qt_plugins_dir: String,
    pub cli_modules_dir: String,
    pub python_stdlib_dir: String,
    pub python_sitepackages_dir: String,
}

/// Everything known about the bundle being fixed, fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleContext {
    /// The name of the main executable.
    pub app_name: String,
    /// The root of the bundle (e.g., `Slicer.app`).
    pub app_dir: PathBuf,
    /// The build trees that binaries may reference by absolute path.
    pub build_roots: Vec<PathBuf>,
    /// Libraries that the packaging step already placed in the bundle.
    pub libs: Vec<PathBuf>,
    /// Directories searched for dependencies that cannot be located otherwise.
    pub search_paths: Vec<PathBuf>,
    pub layout: BundleLayout,
}

impl BundleContext {
    /// Create the context for a run from a parsed manifest.
    ///
    /// A relative bundle root is interpreted against the current directory.
    pub fn from_manifest(manifest: &Manifest) -> io::Result<Self> {
        debug!(
            "Using manifest generated from `{}`",
            manifest.fixup_path.simplified_display()
        );

        Ok(Self {
            app_name: manifest.app_name.clone(),
            app_dir: std::path::absolute(&manifest.app_dir)?,
            build_roots: vec![manifest.build_dir.clone(), manifest.superbuild_dir.clone()],
            libs: manifest.libs.clone(),
            search_paths: manifest.libs_path.clone(),
            layout: BundleLayout {
                lib_dir: manifest.lib_dir.clone(),
                itk_factories_dir: manifest.itk_factories_dir.clone(),
                qt_modules_dir: manifest.qt_modules_dir.clone(),
                qt_plugins_dir: manifest.qt_plugins_dir.clone(),
                cli_modules_dir: manifest.cli_modules_dir.clone(),
                python_stdlib_dir: manifest.python_stdlib_dir.clone(),
                python_sitepackages_dir: manifest.python_sitepackages_dir.clone(),
            },
        })
    }

    /// Read the manifest at `path` and create the context for a run from it.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let manifest = Manifest::from_path(path)?;
        Ok(Self::from_manifest(&manifest)?)
    }
}
