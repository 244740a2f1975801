use kiln_core::recipe::identity_from_path;
use kiln_core::{Error, parse_recipe};
use std::path::Path;
use tempfile::TempDir;

fn write_recipe(root: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("Dockerfile.template");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn parses_registry_reference_with_tag() {
    let tmp = TempDir::new().unwrap();
    let path = write_recipe(
        tmp.path(),
        "python",
        "FROM registry.example.com/team/ubuntu:2404\nRUN apt-get update\n",
    );

    let recipe = parse_recipe(&path).unwrap();

    assert_eq!(recipe.identity, "python");
    assert_eq!(
        recipe.parent_reference_long,
        "registry.example.com/team/ubuntu:2404"
    );
    assert_eq!(recipe.parent_reference_short, "ubuntu");
    assert_eq!(recipe.parent_version_expression.as_deref(), Some("2404"));
    assert!(recipe.directory.ends_with("python"));
    assert!(recipe.latest_version.is_none());
    assert!(recipe.next_version.is_none());
}

#[test]
fn parses_templated_parent_version() {
    let tmp = TempDir::new().unwrap();
    let path = write_recipe(
        tmp.path(),
        "app",
        "FROM {{REGISTRY}}/java-base:{{JAVA_BASE_VERSION}}\n",
    );

    let recipe = parse_recipe(&path).unwrap();

    assert_eq!(recipe.parent_reference_short, "java-base");
    assert_eq!(
        recipe.parent_version_expression.as_deref(),
        Some("{{JAVA_BASE_VERSION}}")
    );
}

#[test]
fn stage_alias_does_not_change_lineage() {
    let tmp = TempDir::new().unwrap();
    let plain = parse_recipe(&write_recipe(tmp.path(), "one", "FROM ubuntu:2404\n")).unwrap();
    let upper =
        parse_recipe(&write_recipe(tmp.path(), "two", "FROM ubuntu:2404 AS base\n")).unwrap();
    let lower =
        parse_recipe(&write_recipe(tmp.path(), "three", "FROM ubuntu:2404 as base\n")).unwrap();

    for recipe in [&plain, &upper, &lower] {
        assert_eq!(recipe.parent_reference_long, "ubuntu:2404");
        assert_eq!(recipe.parent_reference_short, "ubuntu");
        assert_eq!(recipe.parent_version_expression.as_deref(), Some("2404"));
    }
}

#[test]
fn crlf_line_endings_are_tolerated() {
    let tmp = TempDir::new().unwrap();
    let path = write_recipe(tmp.path(), "win", "FROM alpine:3.20\r\nRUN true\r\n");

    let recipe = parse_recipe(&path).unwrap();

    assert_eq!(recipe.parent_reference_long, "alpine:3.20");
}

#[test]
fn first_line_without_marker_fails() {
    let tmp = TempDir::new().unwrap();
    let path = write_recipe(
        tmp.path(),
        "bad",
        "# syntax=docker/dockerfile:1\nFROM ubuntu:2404\n",
    );

    let err = parse_recipe(&path).unwrap_err();

    assert!(matches!(err, Error::MissingDependencyMarker(_)));
    assert!(err.to_string().contains("FROM "));
}

#[test]
fn empty_recipe_fails() {
    let tmp = TempDir::new().unwrap();
    let path = write_recipe(tmp.path(), "empty", "");

    assert!(matches!(parse_recipe(&path), Err(Error::EmptyRecipe(_))));
}

#[test]
fn missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ghost/Dockerfile.template");

    assert!(matches!(parse_recipe(&path), Err(Error::RecipeRead { .. })));
}

#[test]
fn identity_comes_from_containing_directory() {
    let identity = identity_from_path(Path::new("/images/node-20/Dockerfile")).unwrap();
    assert_eq!(identity, "node-20");
}
