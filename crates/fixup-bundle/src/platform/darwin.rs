use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use fixup_fs::{Simplified, relative_join};
use fixup_macho::{
    InstallNameEdits, InstallNameTool, LoadCommandReader, LoadCommandWriter, Native, Otool,
};

use crate::materialize::materialize;
use crate::platform::{Platform, PlatformOptions, ReaderKind, SearchHints};
use crate::{
    BundleContext, BundleLayout, Classifier, Edits, Error, Materialized, ObjectMetadata, Rule,
    RuleTable,
};

/// macOS application bundles (`Slicer.app/Contents/...`) made of Mach-O binaries.
pub struct DarwinPlatform {
    context: BundleContext,
    classifier: Classifier,
    allow_unresolved: Vec<String>,
    reader: Box<dyn LoadCommandReader>,
    writer: Box<dyn LoadCommandWriter>,
}

impl DarwinPlatform {
    /// Create the platform, using `otool` or the native parser to read binaries and
    /// `install_name_tool` to rewrite them.
    pub fn new(context: BundleContext, options: &PlatformOptions) -> Result<Self, Error> {
        let reader: Box<dyn LoadCommandReader> = match options.reader {
            ReaderKind::Otool => Box::new(
                options
                    .otool
                    .clone()
                    .map_or_else(Otool::default, Otool::new),
            ),
            ReaderKind::Native => Box::new(Native),
        };
        let writer = Box::new(
            options
                .install_name_tool
                .clone()
                .map_or_else(InstallNameTool::default, InstallNameTool::new)
                .with_adhoc_sign(options.adhoc_sign),
        );
        Self::with_tools(context, options, reader, writer)
    }

    /// Create the platform with a custom reader and writer.
    pub fn with_tools(
        context: BundleContext,
        options: &PlatformOptions,
        reader: Box<dyn LoadCommandReader>,
        writer: Box<dyn LoadCommandWriter>,
    ) -> Result<Self, Error> {
        let rules = rule_table(&context.layout)?;
        let classifier = Classifier::new(&context, options.allow_frameworks.clone(), rules);
        Ok(Self {
            context,
            classifier,
            allow_unresolved: options.allow_unresolved.clone(),
            reader,
            writer,
        })
    }

    /// Expand the `@loader_path` and `@executable_path` tokens of a search hint.
    fn expand_hint(&self, hint: &str, referrer: &Path) -> PathBuf {
        if let Some(rest) = hint.strip_prefix("@loader_path") {
            relative_join(referrer.parent().unwrap_or(referrer), [rest])
        } else if let Some(rest) = hint.strip_prefix("@executable_path") {
            let executable = self.executable();
            relative_join(executable.parent().unwrap_or(&executable), [rest])
        } else {
            PathBuf::from(hint)
        }
    }
}

/// The classification rules for macOS bundles, most specific first.
///
/// Destinations are relative to `Contents`.
pub fn rule_table(layout: &BundleLayout) -> Result<RuleTable, Error> {
    let BundleLayout {
        lib_dir,
        itk_factories_dir,
        qt_modules_dir,
        qt_plugins_dir,
        cli_modules_dir,
        python_stdlib_dir,
        python_sitepackages_dir,
    } = layout;

    RuleTable::new(vec![
        Rule::new(r"Contents/bin/([^/]+)", ["bin"])?,
        Rule::new(r"([^/]+\.framework)/(.+)", ["Frameworks"])?,
        Rule::new(r"(libpython[^/]+\.dylib)$", ["lib/Python/lib"])?,
        Rule::new(
            r"lib-dynload/([^/]+\.so)$",
            ["lib/Python", python_stdlib_dir.as_str(), "lib-dynload"],
        )?,
        Rule::new(
            &format!(
                r"{}/(.+\.(?:so|dylib))$",
                regex::escape(python_sitepackages_dir)
            ),
            ["lib/Python", python_sitepackages_dir.as_str()],
        )?,
        Rule::new(r"tcl-build/lib/(lib[^/]+\.dylib)$", ["lib/TclTk/lib"])?,
        Rule::new(r"(libitcl[^/]+\.dylib)$", ["lib/TclTk/lib/itcl4.0.1"])?,
        Rule::new(
            &format!(r"{}/([^/]+)", regex::escape(cli_modules_dir)),
            [cli_modules_dir],
        )?,
        Rule::new(
            &format!(r"{}/([^/]+\.(?:so|dylib))$", regex::escape(qt_modules_dir)),
            [qt_modules_dir],
        )?,
        Rule::new(
            &format!(
                r"{}/([^/]+Plugin\.(?:so|dylib))$",
                regex::escape(itk_factories_dir)
            ),
            [itk_factories_dir],
        )?,
        Rule::new(
            &format!(
                r"{}/(designer|iconengines|styles|imageformats|sqldrivers)/([^/]+\.(?:so|dylib))",
                regex::escape(qt_plugins_dir)
            ),
            [qt_plugins_dir],
        )?,
        Rule::catch_all(r"([^/]+\.(?:dylib|so))$", [lib_dir])?,
    ])
}

impl Platform for DarwinPlatform {
    fn context(&self) -> &BundleContext {
        &self.context
    }

    fn executable(&self) -> PathBuf {
        self.context
            .app_dir
            .join("Contents")
            .join("MacOS")
            .join(&self.context.app_name)
    }

    fn library_root(&self) -> PathBuf {
        self.context.app_dir.join("Contents")
    }

    fn is_binary(&self, path: &Path) -> Result<bool, Error> {
        Ok(fixup_macho::is_macho_file(path)?)
    }

    fn inspect(&self, path: &Path) -> Result<ObjectMetadata, Error> {
        Ok(self.reader.read(path)?.into())
    }

    fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn resolve_reference_path(
        &self,
        reference: &str,
        hints: SearchHints<'_>,
    ) -> Result<PathBuf, Error> {
        let referrer_dir = hints.referrer.parent().unwrap_or(hints.referrer);
        let executable = self.executable();
        let executable_dir = executable.parent().unwrap_or(&executable);

        let mut candidates = Vec::new();

        // The part of the reference to look for in each search path.
        let rest = if reference.starts_with('/') {
            candidates.push(PathBuf::from(reference));
            None
        } else if let Some(rest) = reference.strip_prefix("@rpath/") {
            // Build systems may drop the rpaths of libraries, so fall back to those of the
            // executable.
            for hint in hints.referrer_hints {
                candidates.push(relative_join(
                    self.expand_hint(hint, hints.referrer),
                    [rest],
                ));
            }
            for hint in hints.executable_hints {
                candidates.push(relative_join(self.expand_hint(hint, &executable), [rest]));
            }
            Some(rest)
        } else if let Some(rest) = reference.strip_prefix("@loader_path/") {
            candidates.push(relative_join(referrer_dir, [rest]));
            Some(rest)
        } else if let Some(rest) = reference.strip_prefix("@executable_path/") {
            candidates.push(relative_join(executable_dir, [rest]));
            Some(rest)
        } else {
            Some(reference)
        };

        let file_name = Path::new(reference).file_name();
        for search_path in &self.context.search_paths {
            if let Some(rest) = rest {
                candidates.push(relative_join(search_path, [rest]));
            }
            if let Some(file_name) = file_name {
                candidates.push(search_path.join(file_name));
            }
        }

        for candidate in candidates {
            trace!("Trying {}", candidate.simplified_display());
            if candidate.is_file() {
                debug!(
                    "Resolved `{reference}` to {}",
                    candidate.simplified_display()
                );
                return Ok(candidate);
            }
        }

        Err(Error::UnresolvedDependency {
            reference: reference.to_string(),
            referrer: hints.referrer.to_path_buf(),
        })
    }

    /// Copy a dependency into the bundle.
    ///
    /// Frameworks are copied whole: a file inside `Foo.framework` copies the entire framework
    /// to `Contents/Frameworks/Foo.framework`.
    fn materialize(&self, source: &Path, target: &Path) -> Result<Materialized, Error> {
        let framework = source.ancestors().skip(1).find_map(|ancestor| {
            let name = ancestor.file_name()?;
            name.to_str()?
                .ends_with(".framework")
                .then_some((ancestor, name))
        });

        if let Some((framework, name)) = framework {
            let target = self.library_root().join("Frameworks").join(name);
            debug!(
                "Copying the framework {} for {}",
                framework.simplified_display(),
                source.simplified_display()
            );
            return materialize(framework, &target, &self.context.app_dir);
        }

        materialize(source, target, &self.context.app_dir)
    }

    fn canonical_reference(&self, relative: &Path) -> String {
        format!("@rpath/{}", to_slash(relative))
    }

    fn loader_hint(&self, relative_to_root: &Path) -> String {
        let relative = to_slash(relative_to_root);
        if relative.is_empty() {
            "@loader_path/./".to_string()
        } else {
            format!("@loader_path/{relative}/")
        }
    }

    fn is_allowed_unresolved(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.allow_unresolved
            .iter()
            .any(|name| path.contains(name.as_str()))
    }

    fn rewrite(&self, path: &Path, edits: &Edits) -> Result<(), Error> {
        Ok(self.writer.write(path, &InstallNameEdits::from(edits))?)
    }
}

/// Render a relative path with `/` separators.
fn to_slash(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
