//! Semantic version bumping and the released-version catalog.

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Version component a build or push pass increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BumpScope {
    Major,
    Minor,
    #[default]
    Patch,
}

impl From<&str> for BumpScope {
    /// Unrecognized scopes, including the empty string, fall back to `Patch`.
    fn from(scope: &str) -> Self {
        match scope.trim().to_ascii_lowercase().as_str() {
            "major" => Self::Major,
            "minor" => Self::Minor,
            "patch" => Self::Patch,
            other => {
                tracing::debug!(scope = other, "unrecognized scope, using patch");
                Self::Patch
            }
        }
    }
}

impl fmt::Display for BumpScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        })
    }
}

/// Compute the next version from the latest released one.
///
/// An absent `latest` counts as `0.0.0`. A patch bump of a pre-release only
/// drops the pre-release and build metadata (`1.2.3-rc.1` → `1.2.3`).
///
/// ```
/// use kiln_core::{BumpScope, resolve};
///
/// assert_eq!(resolve(None, BumpScope::Minor).to_string(), "0.1.0");
/// ```
pub fn resolve(latest: Option<&Version>, scope: BumpScope) -> Version {
    let base = latest.cloned().unwrap_or_else(|| Version::new(0, 0, 0));

    match scope {
        BumpScope::Major => Version::new(increment(base.major, "major"), 0, 0),
        BumpScope::Minor => Version::new(base.major, increment(base.minor, "minor"), 0),
        BumpScope::Patch => {
            if base.pre == Prerelease::EMPTY && base.build == BuildMetadata::EMPTY {
                Version::new(base.major, base.minor, increment(base.patch, "patch"))
            } else {
                Version::new(base.major, base.minor, base.patch)
            }
        }
    }
}

/// `value + 1`, or `value` itself with a warning when it would overflow.
fn increment(value: u64, component: &str) -> u64 {
    match value.checked_add(1) {
        Some(next) => next,
        None => {
            tracing::warn!(component, value, "version component cannot be bumped further");
            value
        }
    }
}

/// Parse a version leniently: a leading `v` and missing minor/patch
/// components are accepted (`v2` → `2.0.0`, `1.4` → `1.4.0`).
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let padding = match core.matches('.').count() {
        0 => ".0.0",
        1 => ".0",
        _ => "",
    };

    match Version::parse(&format!("{core}{padding}{suffix}")) {
        Ok(version) => Some(version),
        Err(e) => {
            tracing::debug!(raw, error = %e, "not a semantic version");
            None
        }
    }
}

/// Latest released version per image name.
///
/// Built once per invocation from the version source, read-only afterwards.
/// Serializes as a JSON object of `name → "x.y.z"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionCatalog(BTreeMap<String, Version>);

impl VersionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &str) -> Option<&Version> {
        self.0.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.0.contains_key(identity)
    }

    /// Record `version` for `identity`, keeping whichever is higher.
    pub fn observe(&mut self, identity: &str, version: Version) {
        match self.0.get_mut(identity) {
            Some(current) if *current >= version => {}
            Some(current) => *current = version,
            None => {
                self.0.insert(identity.to_owned(), version);
            }
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Version) -> bool) {
        self.0.retain(|identity, version| keep(identity, version));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Version)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::Error::CatalogSerialize { source: e })
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::CatalogParse { source: e })
    }

    /// Write the catalog as pretty JSON followed by a newline.
    pub fn write_json(&self, path: &Path) -> crate::Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json).map_err(|e| crate::Error::CatalogWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl FromIterator<(String, Version)> for VersionCatalog {
    fn from_iter<I: IntoIterator<Item = (String, Version)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (identity, version) in iter {
            catalog.observe(&identity, version);
        }
        catalog
    }
}
