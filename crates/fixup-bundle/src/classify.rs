use std::path::{Component, Path, PathBuf};

use regex::Regex;

use fixup_fs::normalize_path;

use crate::{BundleContext, BundledPath, Error};

/// References under these prefixes are provided by the operating system.
pub const SYSTEM_PREFIXES: &[&str] = &["/System", "/Library", "/usr/lib/", "/opt/X11/"];

/// The outcome of classifying a dependency reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The dependency belongs in the bundle, at this location.
    Bundled(BundledPath),
    /// The dependency is provided by the system and stays where it is.
    Ignore,
}

/// A pattern matched against a reference, and the directory that matching references are placed
/// into.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    destination: Vec<String>,
    catch_all: bool,
}

impl Rule {
    pub fn new<I, S>(pattern: &str, destination: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pattern = Regex::new(pattern)
            .map_err(|err| Error::InvalidRuleTable(format!("Invalid pattern `{pattern}`: {err}")))?;
        Ok(Self {
            pattern,
            destination: destination.into_iter().map(Into::into).collect(),
            catch_all: false,
        })
    }

    /// A rule that matches any shared library, which must come last.
    pub fn catch_all<I, S>(pattern: &str, destination: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            catch_all: true,
            ..Self::new(pattern, destination)?
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    /// The bundled path for `reference`: the destination followed by the captured groups.
    pub fn apply(&self, reference: &str) -> Option<BundledPath> {
        let captures = self.pattern.captures(reference)?;
        let groups = captures
            .iter()
            .skip(1)
            .flatten()
            .map(|group| group.as_str().to_string());
        Some(BundledPath::new(
            self.destination.iter().cloned().chain(groups),
        ))
    }
}

/// An ordered list of [`Rule`]s, most specific first. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct RuleTable(Vec<Rule>);

impl RuleTable {
    /// Validate and create a rule table: exactly one catch-all rule, declared last.
    pub fn new(rules: Vec<Rule>) -> Result<Self, Error> {
        let Some(last) = rules.last() else {
            return Err(Error::InvalidRuleTable("no rules were declared".to_string()));
        };
        if !last.is_catch_all() {
            return Err(Error::InvalidRuleTable(format!(
                "the last rule (`{}`) must be the catch-all",
                last.pattern()
            )));
        }
        if let Some(rule) = rules[..rules.len() - 1]
            .iter()
            .find(|rule| rule.is_catch_all())
        {
            return Err(Error::InvalidRuleTable(format!(
                "the catch-all rule `{}` must be declared last",
                rule.pattern()
            )));
        }
        Ok(Self(rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.0
    }

    pub fn apply(&self, reference: &str) -> Option<BundledPath> {
        self.0.iter().find_map(|rule| rule.apply(reference))
    }
}

/// Decides where, if anywhere, a dependency reference belongs in the bundle.
#[derive(Debug, Clone)]
pub struct Classifier {
    roots: Vec<PathBuf>,
    allow_frameworks: Vec<String>,
    rules: RuleTable,
}

impl Classifier {
    pub fn new(context: &BundleContext, allow_frameworks: Vec<String>, rules: RuleTable) -> Self {
        let roots = context
            .build_roots
            .iter()
            .chain(std::iter::once(&context.app_dir))
            .cloned()
            .collect();
        Self {
            roots,
            allow_frameworks,
            rules,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Returns `true` if the reference is provided by the operating system.
    pub fn is_system(reference: &str) -> bool {
        SYSTEM_PREFIXES
            .iter()
            .any(|prefix| reference.starts_with(prefix))
    }

    /// Returns `true` if the reference names a framework on the allow-list, like
    /// `QtCore.framework`.
    pub fn uses_allowed_framework(&self, reference: &str) -> bool {
        Path::new(reference).components().any(|component| {
            let Component::Normal(name) = component else {
                return false;
            };
            let Some(name) = name.to_str() else {
                return false;
            };
            name.strip_suffix(".framework").is_some_and(|stem| {
                self.allow_frameworks
                    .iter()
                    .any(|prefix| stem.len() > prefix.len() && stem.starts_with(prefix.as_str()))
            })
        })
    }

    /// Returns `true` if an absolute reference may be followed: it lives in a build tree, in the
    /// bundle, or in an allowed framework.
    pub fn is_permitted_absolute(&self, reference: &str) -> bool {
        let path = normalize_path(reference);
        self.roots.iter().any(|root| path.starts_with(root))
            || self.uses_allowed_framework(reference)
    }

    /// Classify a dependency reference.
    ///
    /// System references are ignored. Absolute references elsewhere outside of the build trees
    /// and the bundle are rejected, and so are references that no rule handles.
    pub fn classify(&self, reference: &str) -> Result<Classification, Error> {
        let normalized = normalize_path(reference);
        let normalized = normalized.to_string_lossy();

        if Self::is_system(&normalized) {
            return Ok(Classification::Ignore);
        }

        if normalized.starts_with('/') && !self.is_permitted_absolute(&normalized) {
            return Err(Error::ProhibitedAbsoluteReference {
                reference: reference.to_string(),
            });
        }

        self.rules
            .apply(&normalized)
            .map(Classification::Bundled)
            .ok_or_else(|| Error::UnhandledReference {
                reference: reference.to_string(),
            })
    }
}
