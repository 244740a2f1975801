//! Recipe (`Dockerfile.template`) parsing.
//!
//! Only the first line of a recipe carries lineage: it must be a
//! `FROM <reference>` declaration. Everything after it is left to the
//! templating step.

use semver::Version;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// File name recognized as a lineage-bearing recipe.
pub const RECIPE_FILE_NAME: &str = "Dockerfile.template";

/// File name the rendered recipe is written to, next to the template.
pub const RENDERED_FILE_NAME: &str = "Dockerfile";

/// Prefix the first recipe line must start with.
pub const DEPENDENCY_MARKER: &str = "FROM ";

/// One discovered build recipe.
///
/// # Examples
///
/// ```
/// use kiln_core::RecipeDescriptor;
/// use std::path::PathBuf;
///
/// let recipe = RecipeDescriptor::new(
///     "python",
///     PathBuf::from("/images/python/Dockerfile.template"),
///     "registry.example.com/team/ubuntu:2404",
/// );
/// assert_eq!(recipe.parent_reference_short, "ubuntu");
/// assert_eq!(recipe.parent_version_expression.as_deref(), Some("2404"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDescriptor {
    /// Image name, taken from the containing directory
    pub identity: String,
    /// Directory holding the recipe; the unit of replication
    pub directory: PathBuf,
    /// Path to the `Dockerfile.template` itself
    pub recipe_path: PathBuf,
    /// Full base-image reference as declared (`registry/path/name:tag`)
    pub parent_reference_long: String,
    /// Bare repository name of the parent; key into the lineage index
    pub parent_reference_short: String,
    /// Tag part of the declared reference, possibly a template expression
    pub parent_version_expression: Option<String>,
    /// Highest released version of this image, if any
    pub latest_version: Option<Version>,
    /// Version computed during a build or push pass
    pub next_version: Option<Version>,
}

impl RecipeDescriptor {
    /// Build a descriptor from an identity, recipe path and declared parent reference.
    pub fn new(identity: &str, recipe_path: PathBuf, parent_reference_long: &str) -> Self {
        let directory = recipe_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let (short, version_expression) = split_reference(parent_reference_long);

        Self {
            identity: identity.to_owned(),
            directory,
            recipe_path,
            parent_reference_long: parent_reference_long.to_owned(),
            parent_reference_short: short,
            parent_version_expression: version_expression,
            latest_version: None,
            next_version: None,
        }
    }

    /// Latest released version, or `0.0.0` for images never released.
    pub fn latest_version_or_zero(&self) -> Version {
        self.latest_version
            .clone()
            .unwrap_or_else(|| Version::new(0, 0, 0))
    }

    pub fn with_latest_version(mut self, version: Option<Version>) -> Self {
        self.latest_version = version;
        self
    }

    pub fn with_next_version(mut self, version: Version) -> Self {
        self.next_version = Some(version);
        self
    }

    /// Whether the recipe declares no tracked parent at all.
    pub fn has_parent(&self) -> bool {
        !self.parent_reference_short.is_empty()
    }
}

/// Parse the recipe at `path` into a descriptor.
///
/// Reads the first line only. Fails when the file cannot be opened, is
/// empty, or its first line is not a `FROM ` declaration.
pub fn parse_recipe(path: &Path) -> crate::Result<RecipeDescriptor> {
    let recipe_path = std::path::absolute(path).map_err(|e| crate::Error::RecipePathResolve {
        path: path.to_path_buf(),
        source: e,
    })?;
    let identity = identity_from_path(&recipe_path)?;
    tracing::debug!(identity = %identity, path = %recipe_path.display(), "parsing recipe");

    let file = std::fs::File::open(&recipe_path).map_err(|e| crate::Error::RecipeRead {
        path: recipe_path.clone(),
        source: e,
    })?;

    let first_line = match std::io::BufReader::new(file).lines().next() {
        Some(line) => line.map_err(|e| crate::Error::RecipeRead {
            path: recipe_path.clone(),
            source: e,
        })?,
        None => return Err(crate::Error::EmptyRecipe(recipe_path)),
    };

    let declaration = first_line.trim_end_matches('\r');
    let reference = declaration
        .strip_prefix(DEPENDENCY_MARKER)
        .ok_or_else(|| crate::Error::MissingDependencyMarker(recipe_path.clone()))?;

    Ok(RecipeDescriptor::new(
        &identity,
        recipe_path,
        strip_stage_alias(reference.trim()),
    ))
}

/// Image name for a recipe (or rendered Dockerfile) path: its directory's base name.
pub fn identity_from_path(path: &Path) -> crate::Result<String> {
    let absolute = std::path::absolute(path).map_err(|e| crate::Error::RecipePathResolve {
        path: path.to_path_buf(),
        source: e,
    })?;

    absolute
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or(crate::Error::NoContainingDirectory(absolute))
}

/// Split `registry/path/name:tag` into (`name`, `Some("tag")`).
fn split_reference(reference: &str) -> (String, Option<String>) {
    let last_segment = reference.rsplit('/').next().unwrap_or(reference);
    match last_segment.split_once(':') {
        Some((name, tag)) if !tag.is_empty() => (name.to_owned(), Some(tag.to_owned())),
        Some((name, _)) => (name.to_owned(), None),
        None => (last_segment.to_owned(), None),
    }
}

/// Drop a trailing `AS <stage>` from a `FROM` reference.
fn strip_stage_alias(reference: &str) -> &str {
    let lowered = reference.to_ascii_lowercase();
    match lowered.rfind(" as ") {
        Some(pos) if !reference[pos + 4..].trim().contains(char::is_whitespace) => {
            reference[..pos].trim_end()
        }
        _ => reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reference_with_registry_and_tag() {
        let (short, tag) = split_reference("registry.example.com/team/ubuntu:2404");
        assert_eq!(short, "ubuntu");
        assert_eq!(tag.as_deref(), Some("2404"));
    }

    #[test]
    fn split_reference_registry_port_is_not_a_tag() {
        let (short, tag) = split_reference("localhost:5000/base");
        assert_eq!(short, "base");
        assert!(tag.is_none());
    }

    #[test]
    fn split_reference_templated_tag() {
        let (short, tag) = split_reference("reg/java-base:{{JAVA_BASE_VERSION}}");
        assert_eq!(short, "java-base");
        assert_eq!(tag.as_deref(), Some("{{JAVA_BASE_VERSION}}"));
    }

    #[test]
    fn stage_alias_is_stripped_in_any_case() {
        assert_eq!(strip_stage_alias("ubuntu:2404 AS base"), "ubuntu:2404");
        assert_eq!(strip_stage_alias("ubuntu:2404 as base"), "ubuntu:2404");
        assert_eq!(strip_stage_alias("ubuntu:2404"), "ubuntu:2404");
    }
}
