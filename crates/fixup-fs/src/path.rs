use std::path::{Component, Path, PathBuf};

pub trait Simplified {
    /// Simplify a [`Path`].
    ///
    /// On Windows, this will strip the `\\?\` prefix from paths. On other platforms, it's a no-op.
    fn simplified(&self) -> &Path;

    /// Render a [`Path`] for user-facing display.
    ///
    /// On Windows, this will strip the `\\?\` prefix from paths. On other platforms, it's
    /// equivalent to [`std::path::Display`].
    fn simplified_display(&self) -> std::path::Display<'_>;
}

impl<T: AsRef<Path>> Simplified for T {
    fn simplified(&self) -> &Path {
        dunce::simplified(self.as_ref())
    }

    fn simplified_display(&self) -> std::path::Display<'_> {
        dunce::simplified(self.as_ref()).display()
    }
}

/// Normalize a path, removing things like `.` and `..`.
///
/// This is purely lexical: symbolic links are not resolved, and `..` at the root is dropped.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let mut components = path.as_ref().components().peekable();
    let mut ret = if let Some(c @ Component::Prefix(..)) = components.peek().copied() {
        components.next();
        PathBuf::from(c.as_os_str())
    } else {
        PathBuf::new()
    };

    for component in components {
        match component {
            Component::Prefix(..) => unreachable!(),
            Component::RootDir => {
                ret.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                ret.pop();
            }
            Component::Normal(c) => {
                ret.push(c);
            }
        }
    }
    ret
}

/// Join `parts` onto `base` and normalize the result.
///
/// Unlike [`Path::join`], an absolute part does not replace the path built so far: its leading
/// separators are stripped and it is appended like a relative one. Empty parts are skipped.
///
/// ```text
/// relative_join("/build/Slicer.app/Contents", ["lib", "/Slicer-5.6/qt-loadable-modules"])
///     == "/build/Slicer.app/Contents/lib/Slicer-5.6/qt-loadable-modules"
/// ```
pub fn relative_join<I, S>(base: impl AsRef<Path>, parts: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut path = base.as_ref().to_path_buf();
    for part in parts {
        let part = part.as_ref().trim_start_matches(['/', '\\']);
        if part.is_empty() {
            continue;
        }
        path.push(part);
    }
    normalize_path(path)
}

/// Returns `true` if `path` is `root` or lies underneath it, comparing normalized components.
pub fn is_within(path: impl AsRef<Path>, root: impl AsRef<Path>) -> bool {
    normalize_path(path).starts_with(normalize_path(root))
}
