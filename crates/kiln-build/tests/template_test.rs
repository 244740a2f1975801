use kiln_build::{TemplateEngine, TemplateError};
use kiln_core::PropertySet;
use tempfile::TempDir;

fn props() -> PropertySet {
    [
        ("IMAGE_NAME", "python"),
        ("BASE_VERSION", "1.4.0"),
        ("MOTD", "<hello & welcome>"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn renders_variables_without_escaping() {
    let engine = TemplateEngine::new();

    let rendered = engine
        .render_str("FROM base:{{BASE_VERSION}}\nLABEL motd=\"{{MOTD}}\"", &props())
        .unwrap();

    assert_eq!(rendered, "FROM base:1.4.0\nLABEL motd=\"<hello & welcome>\"");
}

#[test]
fn unknown_variable_renders_empty() {
    let engine = TemplateEngine::new();
    assert_eq!(engine.render_str("x{{MISSING}}y", &props()).unwrap(), "xy");
}

#[test]
fn malformed_template_is_an_error() {
    let engine = TemplateEngine::new();
    let err = engine.render_str("FROM {{BASE_VERSION", &props()).unwrap_err();
    assert!(matches!(err, TemplateError::Render { .. }));
}

#[test]
fn render_file_creates_output_directories() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("Dockerfile.template");
    std::fs::write(&input, "FROM base:{{BASE_VERSION}}\n").unwrap();
    let output = tmp.path().join("out/nested/Dockerfile");

    TemplateEngine::new()
        .render_file(&input, &output, &props())
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(output).unwrap(),
        "FROM base:1.4.0\n"
    );
}

#[cfg(unix)]
#[test]
fn render_file_keeps_permission_bits() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("entrypoint.sh.template");
    std::fs::write(&input, "#!/bin/sh\necho {{IMAGE_NAME}}\n").unwrap();
    std::fs::set_permissions(&input, std::fs::Permissions::from_mode(0o755)).unwrap();
    let output = tmp.path().join("entrypoint.sh");

    TemplateEngine::new()
        .render_file(&input, &output, &props())
        .unwrap();

    let mode = std::fs::metadata(&output).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

// ── fill-template ──

#[test]
fn fill_template_falls_back_to_recipe_next_to_input() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("Dockerfile.template"),
        "FROM base:{{BASE_VERSION}}\n",
    )
    .unwrap();
    let output = tmp.path().join("Dockerfile");

    TemplateEngine::new()
        .fill_template(&tmp.path().join("Dockerfile"), &output, &props())
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(output).unwrap(),
        "FROM base:1.4.0\n"
    );
}

#[test]
fn fill_template_missing_template_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("missing.template");

    let err = TemplateEngine::new()
        .fill_template(&input, &tmp.path().join("out"), &props())
        .unwrap_err();

    assert!(matches!(err, TemplateError::NotFound(_)));
}

#[test]
fn fill_template_same_input_and_output_is_left_alone() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("Dockerfile.template");
    std::fs::write(&path, "FROM base:{{BASE_VERSION}}\n").unwrap();

    TemplateEngine::new()
        .fill_template(&path, &path, &props())
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "FROM base:{{BASE_VERSION}}\n"
    );
}
