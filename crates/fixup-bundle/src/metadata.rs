use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use fixup_macho::{InstallNameEdits, LoadCommands};

use crate::{Error, Platform};

/// The load-time metadata of a binary object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// The name the object declares for itself, if it is a library.
    pub self_id: Option<String>,
    /// The shared libraries the object needs at load time.
    pub dependencies: Vec<String>,
    /// Directories the loader searches for loader-relative references.
    pub search_hints: Vec<String>,
}

impl From<LoadCommands> for ObjectMetadata {
    fn from(commands: LoadCommands) -> Self {
        Self {
            self_id: commands.install_id,
            dependencies: commands.dependencies,
            search_hints: commands.rpaths,
        }
    }
}

/// A batch of metadata edits for a single object, applied in one rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edits {
    pub set_id: Option<String>,
    pub delete_hints: Vec<String>,
    pub add_hints: Vec<String>,
    /// `(old, new)` dependency references.
    pub change_references: Vec<(String, String)>,
}

impl Edits {
    pub fn is_empty(&self) -> bool {
        self.set_id.is_none()
            && self.delete_hints.is_empty()
            && self.add_hints.is_empty()
            && self.change_references.is_empty()
    }
}

impl From<&Edits> for InstallNameEdits {
    fn from(edits: &Edits) -> Self {
        Self {
            id: edits.set_id.clone(),
            delete_rpaths: edits.delete_hints.clone(),
            add_rpaths: edits.add_hints.clone(),
            changes: edits.change_references.clone(),
        }
    }
}

/// Metadata read once per object and run.
#[derive(Debug, Default)]
pub struct MetadataCache(FxHashMap<PathBuf, ObjectMetadata>);

impl MetadataCache {
    /// Return the metadata of `path`, inspecting it on first use.
    pub fn get_or_inspect(
        &mut self,
        platform: &dyn Platform,
        path: &Path,
    ) -> Result<&ObjectMetadata, Error> {
        match self.0.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(platform.inspect(path)?)),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&ObjectMetadata> {
        self.0.get(path)
    }
}
