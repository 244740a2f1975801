//! Template properties shared by recipes and build/push commands.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::version::VersionCatalog;

pub const BUILDER_NAME: &str = "KILN_BUILDER_NAME";
pub const BUILDER_EMAIL: &str = "KILN_BUILDER_EMAIL";
pub const BUILDER_HOST: &str = "KILN_BUILDER_HOST";
pub const BUILD_DATE: &str = "KILN_BUILD_DATE";
pub const IMAGE_HIERARCHY: &str = "KILN_IMAGE_HIERARCHY";
pub const SIGNATURE_VALUE: &str = "KILN_SIGNATURE_VALUE";
pub const SIGNATURE_ENVS: &str = "KILN_SIGNATURE_ENVS";
pub const IMAGE_VERSION: &str = "IMAGE_VERSION";
pub const IMAGE_NAME: &str = "IMAGE_NAME";
pub const DOCKERFILE_DIR: &str = "DOCKERFILE_DIR";

/// Placeholder for provenance values that could not be looked up.
pub const UNABLE_TO_DETERMINE: &str = "unable-to-determine";

/// Version assumed for images that were never released.
pub const INITIAL_VERSION: &str = "0.0.0";

/// Name of the per-image version property: `redis-cache` → `REDIS_CACHE_VERSION`.
pub fn version_property_name(identity: &str) -> String {
    format!("{}_VERSION", normalize_name(identity))
}

/// Upper-case `name` and replace `-` and `.` with `_`.
pub fn normalize_name(name: &str) -> String {
    name.to_uppercase().replace(['-', '.'], "_")
}

/// Flat string properties bound as template variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertySet(BTreeMap<String, String>);

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set `<ID>_VERSION` for `identity`.
    pub fn set_image_version(&mut self, identity: &str, version: &str) {
        let name = version_property_name(identity);
        tracing::debug!(property = %name, version, "setting image version property");
        self.set(name, version);
    }

    /// Expose every released version as an `<ID>_VERSION` property.
    pub fn apply_catalog(&mut self, catalog: &VersionCatalog) {
        for (identity, version) in catalog.iter() {
            self.set_image_version(identity, &version.to_string());
        }
    }

    /// Apply runtime `KEY=VALUE` overrides; malformed entries are skipped with a warning.
    pub fn apply_overrides<S: AsRef<str>>(&mut self, overrides: &[S]) {
        for raw in overrides {
            let raw = raw.as_ref();
            match raw.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    tracing::debug!(key, value, "overriding config property");
                    self.set(key, value);
                }
                _ => tracing::warn!(
                    property = raw,
                    "unable to parse property, expected KEY=VALUE"
                ),
            }
        }
    }

    /// Give every image without a version property the initial `0.0.0`.
    ///
    /// Lets a recipe whose parent was never released still render.
    pub fn fill_missing_versions<'a>(&mut self, identities: impl IntoIterator<Item = &'a str>) {
        for identity in identities {
            if !self.contains(&version_property_name(identity)) {
                self.set_image_version(identity, INITIAL_VERSION);
            }
        }
    }

    /// `KEY=value` lines, sorted by key.
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("\t{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertySet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
