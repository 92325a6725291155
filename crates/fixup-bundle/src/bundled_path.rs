use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use fixup_fs::relative_join;

/// The canonical location of a dependency inside the bundle, as path segments relative to the
/// shared-library root.
///
/// Segments may themselves contain `/` (e.g., a destination directory like `lib/Python/lib`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundledPath(Vec<String>);

impl BundledPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The normalized path relative to the shared-library root.
    pub fn relative_path(&self) -> PathBuf {
        relative_join("", &self.0)
    }

    /// The absolute location of this path under `root`.
    pub fn join_to(&self, root: &Path) -> PathBuf {
        relative_join(root, &self.0)
    }
}

impl Display for BundledPath {
    /// Renders the relative path with `/` separators, as used in load commands.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let path = self.relative_path();
        let mut first = true;
        for component in path.components() {
            if !first {
                f.write_str("/")?;
            }
            first = false;
            f.write_str(&component.as_os_str().to_string_lossy())?;
        }
        Ok(())
    }
}
