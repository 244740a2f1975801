//! Per-build property stamping: image identity, version and provenance.

use crate::template::TemplateEngine;
use kiln_core::properties::{
    BUILD_DATE, BUILDER_EMAIL, BUILDER_HOST, BUILDER_NAME, DOCKERFILE_DIR, IMAGE_HIERARCHY,
    IMAGE_NAME, IMAGE_VERSION, SIGNATURE_ENVS, SIGNATURE_VALUE,
};
use kiln_core::{PropertySet, RecipeDescriptor};
use semver::Version;

const BUILD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Properties joined into the build signature, in order.
const SIGNATURE_PROPERTIES: [&str; 5] = [
    BUILDER_NAME,
    BUILDER_EMAIL,
    BUILDER_HOST,
    BUILD_DATE,
    IMAGE_HIERARCHY,
];

/// Stamp `props` for building `recipe` at `next_version`.
pub fn stamp_build_properties(
    props: &mut PropertySet,
    recipe: &RecipeDescriptor,
    next_version: &Version,
    engine: &TemplateEngine,
) {
    let version = next_version.to_string();
    props.set(
        BUILD_DATE,
        chrono::Local::now().format(BUILD_DATE_FORMAT).to_string(),
    );
    props.set(IMAGE_NAME, recipe.identity.as_str());
    props.set(DOCKERFILE_DIR, recipe.directory.to_string_lossy());
    props.set(IMAGE_VERSION, version.as_str());
    props.set_image_version(&recipe.identity, &version);

    let hierarchy = image_hierarchy(props, recipe, next_version, engine);
    props.set(IMAGE_HIERARCHY, hierarchy);

    let (value, envs) = signature(props);
    props.set(SIGNATURE_VALUE, value);
    props.set(SIGNATURE_ENVS, envs);
}

/// Lineage string appended to the parent's own hierarchy at image build time:
/// `${KILN_IMAGE_HIERARCHY:-"ubuntu:24.04"}->base:1.3.0`.
fn image_hierarchy(
    props: &PropertySet,
    recipe: &RecipeDescriptor,
    next_version: &Version,
    engine: &TemplateEngine,
) -> String {
    let parent_version = recipe
        .parent_version_expression
        .as_deref()
        .map(|expr| resolve_parent_version(expr, props, engine))
        .unwrap_or_default();
    let suffix = if parent_version.is_empty() {
        String::new()
    } else {
        format!(":{parent_version}")
    };
    tracing::debug!(image = %recipe.identity, parent_version = %parent_version, "resolved parent version");

    format!(
        "${{{IMAGE_HIERARCHY}:-\"{parent}{suffix}\"}}->{name}:{next_version}",
        parent = recipe.parent_reference_short,
        name = recipe.identity,
    )
}

fn resolve_parent_version(expression: &str, props: &PropertySet, engine: &TemplateEngine) -> String {
    match engine.render_str(expression, props) {
        Ok(version) => version,
        Err(e) => {
            tracing::debug!(expression, error = %e, "parent version is not a template, using it verbatim");
            expression.to_owned()
        }
    }
}

fn signature(props: &PropertySet) -> (String, String) {
    let value = SIGNATURE_PROPERTIES
        .iter()
        .map(|key| props.get(key).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(";");
    let envs = SIGNATURE_PROPERTIES
        .iter()
        .map(|key| format!("{key}=\"{}\"", props.get(key).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(" \\\n");
    (value, envs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn recipe(parent: &str) -> RecipeDescriptor {
        RecipeDescriptor::new(
            "python",
            PathBuf::from("/images/python/Dockerfile.template"),
            parent,
        )
    }

    #[test]
    fn stamps_identity_and_version() {
        let mut props = PropertySet::new();
        let engine = TemplateEngine::new();

        stamp_build_properties(&mut props, &recipe("base"), &Version::new(1, 3, 0), &engine);

        assert_eq!(props.get(IMAGE_NAME), Some("python"));
        assert_eq!(props.get(IMAGE_VERSION), Some("1.3.0"));
        assert_eq!(props.get("PYTHON_VERSION"), Some("1.3.0"));
        assert_eq!(props.get(DOCKERFILE_DIR), Some("/images/python"));
        assert!(props.get(BUILD_DATE).is_some_and(|d| d.len() == 19));
    }

    #[test]
    fn hierarchy_resolves_templated_parent_version() {
        let mut props: PropertySet = [("BASE_VERSION", "2.0.1")].into_iter().collect();
        let engine = TemplateEngine::new();

        stamp_build_properties(
            &mut props,
            &recipe("reg/base:{{BASE_VERSION}}"),
            &Version::new(0, 0, 1),
            &engine,
        );

        assert_eq!(
            props.get(IMAGE_HIERARCHY),
            Some("${KILN_IMAGE_HIERARCHY:-\"base:2.0.1\"}->python:0.0.1")
        );
    }

    #[test]
    fn hierarchy_without_parent_tag() {
        let mut props = PropertySet::new();
        let engine = TemplateEngine::new();

        stamp_build_properties(&mut props, &recipe("scratch"), &Version::new(1, 0, 0), &engine);

        assert_eq!(
            props.get(IMAGE_HIERARCHY),
            Some("${KILN_IMAGE_HIERARCHY:-\"scratch\"}->python:1.0.0")
        );
    }

    #[test]
    fn signature_joins_provenance() {
        let mut props: PropertySet = [
            (BUILDER_NAME, "Jane"),
            (BUILDER_EMAIL, "jane@example.com"),
            (BUILDER_HOST, "ci-01"),
        ]
        .into_iter()
        .collect();
        let engine = TemplateEngine::new();

        stamp_build_properties(&mut props, &recipe("base"), &Version::new(1, 0, 0), &engine);

        let value = props.get(SIGNATURE_VALUE).unwrap();
        assert!(value.starts_with("Jane;jane@example.com;ci-01;"));
        let envs = props.get(SIGNATURE_ENVS).unwrap();
        assert!(envs.starts_with("KILN_BUILDER_NAME=\"Jane\" \\\nKILN_BUILDER_EMAIL="));
    }
}
