//! Make application bundles self-contained and relocatable.
//!
//! Fixing a bundle happens in two phases. The [`Walker`] follows the dependencies of the main
//! executable and the installed libraries breadth-first, classifying each reference and copying
//! missing dependencies into the bundle. The [`patch`] phase then rewrites the load-time
//! metadata of every binary in the bundle so that all references resolve inside it.

pub use bundle::{FixReport, fix_bundle, verify_bundle};
pub use bundled_path::BundledPath;
pub use classify::{Classification, Classifier, Rule, RuleTable, SYSTEM_PREFIXES};
pub use context::{BundleContext, BundleLayout};
pub use error::Error;
pub use manifest::{FIELDS as MANIFEST_FIELDS, Manifest, ManifestError};
pub use materialize::{Materialized, materialize};
pub use metadata::{Edits, MetadataCache, ObjectMetadata};
pub use patch::{BinaryObject, PatchOptions, PatchReport, Patcher, RewritePlan, inventory};
pub use platform::{
    Backend, DarwinPlatform, Platform, PlatformOptions, ReaderKind, SearchHints, rule_table,
};
pub use walk::{CopiedDependency, DuplicateSource, WalkReport, Walker};

mod bundle;
mod bundled_path;
mod classify;
mod context;
mod error;
mod manifest;
mod materialize;
mod metadata;
pub mod patch;
mod platform;
mod walk;
