use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use fixup_fs::Simplified;
use fixup_warnings::warn_user;

use crate::platform::SearchHints;
use crate::{Classification, Classifier, Error, Materialized, MetadataCache, Platform};

/// A dependency that was copied into the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedDependency {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// A dependency that was skipped because another source already claimed its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSource {
    pub target: PathBuf,
    /// The source that was copied first.
    pub chosen: PathBuf,
    /// The source that was skipped.
    pub skipped: PathBuf,
}

/// The outcome of collecting the dependencies of a bundle.
#[derive(Debug, Default)]
pub struct WalkReport {
    /// Every target in the bundle, mapped to the file it came from, in discovery order.
    pub resolved: IndexMap<PathBuf, PathBuf>,
    pub copied: Vec<CopiedDependency>,
    /// Targets that were already in the bundle.
    pub already_present: Vec<PathBuf>,
    pub duplicates: Vec<DuplicateSource>,
}

/// Collects the transitive dependencies of a bundle, breadth-first from the main executable
/// and the libraries the packaging step installed.
#[derive(Debug, Default)]
pub struct Walker {
    /// Bundle target to source. The first source to claim a target wins.
    resolved: IndexMap<PathBuf, PathBuf>,
    cache: MetadataCache,
    report: WalkReport,
}

impl Walker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every missing dependency into the bundle.
    #[instrument(skip_all, fields(bundle = %platform.context().app_dir.simplified_display()))]
    pub fn walk(mut self, platform: &dyn Platform) -> Result<WalkReport, Error> {
        let executable = platform.executable();
        let seeds = &platform.context().libs;

        // The installed libraries are already in place.
        for seed in seeds {
            self.resolved.insert(seed.clone(), seed.clone());
        }

        let mut queue: VecDeque<PathBuf> = std::iter::once(executable.clone())
            .chain(seeds.iter().cloned())
            .collect();

        while let Some(item) = queue.pop_front() {
            if !item.exists() {
                return Err(Error::MissingDependencyFile { path: item });
            }
            trace!("Collecting dependencies of {}", item.simplified_display());

            let metadata = self
                .cache
                .get_or_inspect(platform, &item)
                .map_err(|err| err.with_object(&item))?
                .clone();
            let executable_hints = self
                .cache
                .get_or_inspect(platform, &executable)
                .map_err(|err| err.with_object(&executable))?
                .search_hints
                .clone();

            let hints = SearchHints {
                referrer: &item,
                referrer_hints: &metadata.search_hints,
                executable_hints: &executable_hints,
            };

            // Plugins on the allow-unresolved list keep their absolute references.
            let allow_unresolved = platform.is_allowed_unresolved(&item);
            for reference in &metadata.dependencies {
                if allow_unresolved
                    && reference.starts_with('/')
                    && !Classifier::is_system(reference)
                {
                    debug!(
                        "Leaving `{reference}` unresolved in {}",
                        item.simplified_display()
                    );
                    continue;
                }
                if let Some(target) = self
                    .process(platform, reference, hints)
                    .map_err(|err| err.with_object(&item))?
                {
                    queue.push_back(target);
                }
            }
        }

        debug!(
            "Collected {} dependencies ({} copied)",
            self.resolved.len(),
            self.report.copied.len()
        );

        self.report.resolved = self.resolved;
        Ok(self.report)
    }

    /// Place the dependency named by `reference` into the bundle, returning its target if it is
    /// new.
    fn process(
        &mut self,
        platform: &dyn Platform,
        reference: &str,
        hints: SearchHints<'_>,
    ) -> Result<Option<PathBuf>, Error> {
        let Classification::Bundled(bundled) = platform.classify(reference)? else {
            trace!("Ignoring system dependency `{reference}`");
            return Ok(None);
        };
        let target = platform.bundled_location(&bundled);

        if let Some(chosen) = self.resolved.get(&target).cloned() {
            self.check_duplicate(platform, reference, hints, &target, chosen);
            return Ok(None);
        }

        let source = platform.resolve_reference_path(reference, hints)?;
        match platform.materialize(&source, &target)? {
            Materialized::Copied => self.report.copied.push(CopiedDependency {
                source: source.clone(),
                target: target.clone(),
            }),
            Materialized::AlreadyPresent => self.report.already_present.push(target.clone()),
        }

        debug!(
            "Bundled `{reference}` as {} (from {})",
            target.simplified_display(),
            source.simplified_display()
        );
        self.resolved.insert(target.clone(), source);
        Ok(Some(target))
    }

    /// Warn if `reference` resolves to a different file than the one already copied to `target`.
    fn check_duplicate(
        &mut self,
        platform: &dyn Platform,
        reference: &str,
        hints: SearchHints<'_>,
        target: &Path,
        chosen: PathBuf,
    ) {
        // Libraries installed by the packaging step are their own source.
        if chosen == target {
            return;
        }

        let source = match platform.resolve_reference_path(reference, hints) {
            Ok(source) => source,
            Err(err) => {
                debug!("Not checking `{reference}` against the bundled copy: {err}");
                return;
            }
        };

        if is_same_file(&source, &chosen) || is_same_file(&source, target) {
            return;
        }

        warn_user!(
            "Skipping `{}` for `{}`: `{}` was bundled first",
            source.simplified_display(),
            target.simplified_display(),
            chosen.simplified_display()
        );
        self.report.duplicates.push(DuplicateSource {
            target: target.to_path_buf(),
            chosen,
            skipped: source,
        });
    }
}

fn is_same_file(left: &Path, right: &Path) -> bool {
    left == right
        || matches!(
            (fs_err::canonicalize(left), fs_err::canonicalize(right)),
            (Ok(left), Ok(right)) if left == right
        )
}
