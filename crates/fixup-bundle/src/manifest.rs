//! The bundle manifest written by the packaging step.
//!
//! The manifest is a line-oriented list of `key='value'` fields in a fixed order:
//!
//! ```text
//! build_dir='/build/Slicer-build'
//! superbuild_dir='/build'
//! app_name='Slicer'
//! app_dir='/build/Slicer-build/_CPack_Packages/Slicer.app'
//! libs='/build/.../libqSlicerApp.dylib;/build/.../libMRMLCore.dylib'
//! libs_path='/build/Slicer-build/lib/Slicer-5.6;/build/VTK-build/lib'
//! lib_dir='lib/Slicer-5.6'
//! ...
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fixup_fs::{Simplified, normalize_path};

/// The fields of a manifest, in the order they must appear.
pub const FIELDS: [&str; 14] = [
    "build_dir",
    "superbuild_dir",
    "app_name",
    "app_dir",
    "libs",
    "libs_path",
    "lib_dir",
    "itk_factories_dir",
    "qt_modules_dir",
    "qt_plugins_dir",
    "cli_modules_dir",
    "python_stdlib_dir",
    "python_sitepackages_dir",
    "fixup_path",
];

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest at `{}`", path.simplified_display())]
    Read {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("Manifest is missing the `{field}` field")]
    MissingField { field: &'static str },
    #[error("Expected the `{expected}` field on line {line}, found `{found}`")]
    UnexpectedField {
        expected: &'static str,
        found: String,
        line: usize,
    },
    #[error("Malformed manifest line {line}: expected `key='value'`, found `{content}`")]
    Malformed { line: usize, content: String },
    #[error("Manifest field `{field}` must not be empty")]
    EmptyField { field: &'static str },
    #[error("Unexpected content after the `fixup_path` field on line {line}: `{content}`")]
    UnexpectedTrailing { line: usize, content: String },
}

/// The parsed bundle manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub build_dir: PathBuf,
    pub superbuild_dir: PathBuf,
    pub app_name: String,
    pub app_dir: PathBuf,
    pub libs: Vec<PathBuf>,
    pub libs_path: Vec<PathBuf>,
    pub lib_dir: String,
    pub itk_factories_dir: String,
    pub qt_modules_dir: String,
    pub qt_plugins_dir: String,
    pub cli_modules_dir: String,
    pub python_stdlib_dir: String,
    pub python_sitepackages_dir: String,
    pub fixup_path: PathBuf,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs_err::read_to_string(path).map_err(|err| ManifestError::Read {
            path: path.to_path_buf(),
            err,
        })?;
        contents.parse()
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        let mut lines: Vec<&str> = contents
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }

        let mut values = Vec::with_capacity(FIELDS.len());
        for (index, &field) in FIELDS.iter().enumerate() {
            let Some(&line) = lines.get(index) else {
                return Err(ManifestError::MissingField { field });
            };
            values.push(parse_line(line, index + 1, field)?);
        }

        if let Some(&content) = lines.get(FIELDS.len()) {
            return Err(ManifestError::UnexpectedTrailing {
                line: FIELDS.len() + 1,
                content: content.to_string(),
            });
        }

        let [
            build_dir,
            superbuild_dir,
            app_name,
            app_dir,
            libs,
            libs_path,
            lib_dir,
            itk_factories_dir,
            qt_modules_dir,
            qt_plugins_dir,
            cli_modules_dir,
            python_stdlib_dir,
            python_sitepackages_dir,
            fixup_path,
        ] = <[&str; 14]>::try_from(values).map_err(|_| ManifestError::MissingField {
            field: FIELDS[FIELDS.len() - 1],
        })?;

        Ok(Self {
            build_dir: normalize_path(build_dir),
            superbuild_dir: normalize_path(superbuild_dir),
            app_name: app_name.to_string(),
            app_dir: normalize_path(app_dir),
            libs: split_list(libs),
            libs_path: split_list(libs_path),
            lib_dir: normalize_dir(lib_dir),
            itk_factories_dir: normalize_dir(itk_factories_dir),
            qt_modules_dir: normalize_dir(qt_modules_dir),
            qt_plugins_dir: normalize_dir(qt_plugins_dir),
            cli_modules_dir: normalize_dir(cli_modules_dir),
            python_stdlib_dir: normalize_dir(python_stdlib_dir),
            python_sitepackages_dir: normalize_dir(python_sitepackages_dir),
            fixup_path: normalize_path(fixup_path),
        })
    }
}

/// Parse a single `key='value'` line, which must hold the `expected` field.
fn parse_line<'a>(
    line: &'a str,
    number: usize,
    expected: &'static str,
) -> Result<&'a str, ManifestError> {
    let malformed = || ManifestError::Malformed {
        line: number,
        content: line.to_string(),
    };

    let (key, value) = line.split_once('=').ok_or_else(malformed)?;
    let value = value
        .strip_prefix('\'')
        .and_then(|value| value.strip_suffix('\''))
        .ok_or_else(malformed)?;

    if key != expected {
        return Err(ManifestError::UnexpectedField {
            expected,
            found: key.to_string(),
            line: number,
        });
    }
    if value.is_empty() {
        return Err(ManifestError::EmptyField { field: expected });
    }
    Ok(value)
}

fn split_list(value: &str) -> Vec<PathBuf> {
    value
        .split(';')
        .filter(|entry| !entry.is_empty())
        .map(normalize_path)
        .collect()
}

/// Normalize a bundle-relative directory, using `/` as the separator.
fn normalize_dir(value: &str) -> String {
    normalize_path(value)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
