use kiln_core::{Error, KilnConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn load_parses_json_config() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kiln.json");
    let json = r#"{
  "properties": {"REGISTRY": "registry.example.com"},
  "commands": {
    "defaultBuildCommand": "docker build -t {{IMAGE_NAME}}:{{IMAGE_VERSION}} {{DOCKERFILE_DIR}}",
    "defaultPushCommand": "docker push {{IMAGE_NAME}}:{{IMAGE_VERSION}}"
  },
  "rootDir": "images",
  "verbose": true,
  "autoBuildExcludes": ["legacy"],
  "reportFileName": "report.json"
}"#;
    std::fs::write(&path, json).unwrap();

    let config = KilnConfig::load(&path).unwrap();

    assert_eq!(
        config.properties.get("REGISTRY").map(String::as_str),
        Some("registry.example.com")
    );
    assert!(config.commands.default_build_command.starts_with("docker build"));
    assert!(config.commands.default_push_command.starts_with("docker push"));
    assert_eq!(config.root_dir, Some(PathBuf::from("images")));
    assert!(config.verbose);
    assert!(config.is_auto_build_excluded("legacy"));
    assert!(!config.is_auto_build_excluded("base"));
    assert_eq!(config.report_file_name, Some(PathBuf::from("report.json")));
}

#[test]
fn load_parses_toml_config() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kiln.toml");
    let toml = r#"
autoBuildExcludes = ["legacy"]

[properties]
REGISTRY = "registry.example.com"

[commands]
defaultBuildCommand = "docker build {{DOCKERFILE_DIR}}"
"#;
    std::fs::write(&path, toml).unwrap();

    let config = KilnConfig::load(&path).unwrap();

    assert_eq!(config.commands.default_build_command, "docker build {{DOCKERFILE_DIR}}");
    assert!(config.commands.default_push_command.is_empty());
    assert_eq!(config.auto_build_excludes, vec!["legacy"]);
}

#[test]
fn load_empty_object_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kiln.json");
    std::fs::write(&path, "{}").unwrap();

    let config = KilnConfig::load(&path).unwrap();

    assert!(config.properties.is_empty());
    assert!(config.root_dir.is_none());
    assert!(!config.verbose);
    assert!(config.report_file_name.is_none());
}

#[test]
fn load_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    let err = KilnConfig::load(&tmp.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, Error::ConfigLoad { .. }));
}

#[test]
fn load_invalid_json_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("kiln.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        KilnConfig::load(&path),
        Err(Error::ConfigParseJson { .. })
    ));
}

// ── Root directory resolution ──

#[test]
fn root_dir_override_wins() {
    let config = KilnConfig {
        root_dir: Some(PathBuf::from("images")),
        ..Default::default()
    };
    let root = config.resolve_root_dir(Path::new("/repo/kiln.json"), Some(Path::new("/elsewhere")));
    assert_eq!(root, PathBuf::from("/elsewhere"));
}

#[test]
fn relative_root_dir_is_taken_from_config_dir() {
    let config = KilnConfig {
        root_dir: Some(PathBuf::from("images")),
        ..Default::default()
    };
    let root = config.resolve_root_dir(Path::new("/repo/kiln.json"), None);
    assert_eq!(root, PathBuf::from("/repo/images"));
}

#[test]
fn missing_root_dir_defaults_to_config_dir() {
    let config = KilnConfig::default();
    assert_eq!(
        config.resolve_root_dir(Path::new("/repo/kiln.json"), None),
        PathBuf::from("/repo")
    );
    assert_eq!(
        config.resolve_root_dir(Path::new("kiln.json"), None),
        PathBuf::from(".")
    );
}
