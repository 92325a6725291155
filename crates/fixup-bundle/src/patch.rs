use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rustc_hash::FxHashSet;
use tracing::{debug, instrument, trace};
use walkdir::WalkDir;

use fixup_fs::Simplified;

use crate::{Classification, Classifier, Edits, Error, MetadataCache, Platform};

/// A binary object found in the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryObject {
    pub path: PathBuf,
    /// The path with symbolic links resolved, shared by all aliases of the same file.
    pub canonical: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct PatchOptions {
    /// Plan the rewrites without applying them.
    pub dry_run: bool,
    /// The maximum number of binaries rewritten at once.
    pub concurrency: NonZeroUsize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// The edits for a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    pub object: PathBuf,
    pub edits: Edits,
}

#[derive(Debug, Default)]
pub struct PatchReport {
    /// The number of distinct binary objects in the bundle.
    pub objects: usize,
    /// The objects that need edits.
    pub plans: Vec<RewritePlan>,
    /// The number of objects that were rewritten.
    pub rewritten: usize,
}

/// Find every binary object in the bundle, longest path first.
///
/// Symbolic links to binaries are included so that aliases can be recognized.
pub fn inventory(platform: &dyn Platform) -> Result<Vec<BinaryObject>, Error> {
    let mut objects = Vec::new();
    for entry in WalkDir::new(&platform.context().app_dir) {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !platform.is_binary(path)? {
            continue;
        }
        objects.push(BinaryObject {
            path: path.to_path_buf(),
            canonical: fs_err::canonicalize(path)?,
        });
    }

    objects.sort_by(|a, b| {
        b.path
            .as_os_str()
            .len()
            .cmp(&a.path.as_os_str().len())
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(objects)
}

/// Rewrites every binary in the bundle so that its references stay inside the bundle.
pub struct Patcher<'a> {
    platform: &'a dyn Platform,
    objects: Vec<BinaryObject>,
    cache: MetadataCache,
}

impl<'a> Patcher<'a> {
    /// Discover the binaries in the bundle and read their metadata.
    pub fn new(platform: &'a dyn Platform) -> Result<Self, Error> {
        let objects = inventory(platform)?;
        let mut cache = MetadataCache::default();
        for object in &objects {
            cache
                .get_or_inspect(platform, &object.path)
                .map_err(|err| err.with_object(&object.path))?;
        }
        debug!("Found {} binaries in the bundle", objects.len());
        Ok(Self {
            platform,
            objects,
            cache,
        })
    }

    pub fn objects(&self) -> &[BinaryObject] {
        &self.objects
    }

    /// Compute the edits for every object, skipping aliases of objects already planned.
    pub fn plan(&self) -> Result<Vec<RewritePlan>, Error> {
        let mut seen = FxHashSet::default();
        let mut plans = Vec::new();
        for object in &self.objects {
            if !seen.insert(&object.canonical) {
                trace!("Skipping alias {}", object.path.simplified_display());
                continue;
            }
            let edits = self
                .plan_object(object)
                .map_err(|err| err.with_object(&object.path))?;
            if edits.is_empty() {
                trace!("Nothing to rewrite in {}", object.path.simplified_display());
            } else {
                plans.push(RewritePlan {
                    object: object.path.clone(),
                    edits,
                });
            }
        }
        Ok(plans)
    }

    fn plan_object(&self, object: &BinaryObject) -> Result<Edits, Error> {
        let Some(metadata) = self.cache.get(&object.path) else {
            return Ok(Edits::default());
        };
        let root = self.platform.library_root();
        let mut edits = Edits::default();

        if let Some(current) = &metadata.self_id {
            if let Classification::Bundled(bundled) =
                self.platform.classify(&object.path.to_string_lossy())?
            {
                let id = self.platform.canonical_reference(&bundled.relative_path());
                if id != *current {
                    edits.set_id = Some(id);
                }
            }
        }

        let object_dir = object.path.parent().unwrap_or(&object.path);
        let to_root = pathdiff::diff_paths(&root, object_dir).unwrap_or_default();
        let loader_hint = self.platform.loader_hint(&to_root);
        let mut has_loader_hint = false;
        for hint in &metadata.search_hints {
            if hint.starts_with('/') {
                if !edits.delete_hints.contains(hint) {
                    edits.delete_hints.push(hint.clone());
                }
            } else if self.platform.same_hint(hint, &loader_hint) {
                has_loader_hint = true;
            }
        }
        if !has_loader_hint {
            edits.add_hints.push(loader_hint);
        }

        for reference in &metadata.dependencies {
            if reference.starts_with('/') {
                if Classifier::is_system(reference) {
                    continue;
                }
                if self.platform.is_allowed_unresolved(&object.path) {
                    debug!(
                        "Leaving `{reference}` unresolved in {}",
                        object.path.simplified_display()
                    );
                    continue;
                }
                if !self.platform.classifier().is_permitted_absolute(reference) {
                    return Err(Error::ProhibitedAbsoluteReference {
                        reference: reference.clone(),
                    });
                }
            }

            let candidates = self.candidates(reference);
            let [candidate] = candidates.as_slice() else {
                return Err(Error::AmbiguousOrMissingResolution {
                    reference: reference.clone(),
                    object: object.path.clone(),
                    candidates: candidates.iter().map(|path| path.to_path_buf()).collect(),
                });
            };

            let relative = pathdiff::diff_paths(candidate, &root).unwrap_or_default();
            let canonical = self.platform.canonical_reference(&relative);
            if canonical != *reference {
                edits.change_references.push((reference.clone(), canonical));
            }
        }

        Ok(edits)
    }

    /// The objects in the bundle with the same file name as `reference`, one per distinct file.
    fn candidates(&self, reference: &str) -> Vec<&Path> {
        let Some(file_name) = Path::new(reference).file_name() else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        self.objects
            .iter()
            .filter(|object| object.path.file_name() == Some(file_name))
            .filter(|object| seen.insert(&object.canonical))
            .map(|object| object.path.as_path())
            .collect()
    }
}

/// Apply the rewrite plans, with at most `concurrency` rewrites at once.
pub fn apply(
    platform: &dyn Platform,
    plans: &[RewritePlan],
    concurrency: NonZeroUsize,
) -> Result<(), Error> {
    // Rayon workers don't inherit the caller's span.
    let span = tracing::Span::current();
    let rewrite = |plan: &RewritePlan| {
        let _enter = span.enter();
        debug!("Rewriting {}", plan.object.simplified_display());
        platform
            .rewrite(&plan.object, &plan.edits)
            .map_err(|err| err.with_object(&plan.object))
    };

    if concurrency.get() == 1 {
        return plans.iter().try_for_each(rewrite);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.get())
        .build()?;
    pool.install(|| plans.par_iter().try_for_each(rewrite))
}

/// Rewrite every binary in the bundle so that all of its references resolve inside the bundle.
#[instrument(skip_all, fields(bundle = %platform.context().app_dir.simplified_display()))]
pub fn patch(platform: &dyn Platform, options: &PatchOptions) -> Result<PatchReport, Error> {
    let patcher = Patcher::new(platform)?;
    let plans = patcher.plan()?;
    let objects = patcher
        .objects()
        .iter()
        .map(|object| &object.canonical)
        .collect::<FxHashSet<_>>()
        .len();

    if options.dry_run {
        debug!("Planned {} rewrites (dry run)", plans.len());
        return Ok(PatchReport {
            objects,
            plans,
            rewritten: 0,
        });
    }

    apply(platform, &plans, options.concurrency)?;
    Ok(PatchReport {
        objects,
        rewritten: plans.len(),
        plans,
    })
}
