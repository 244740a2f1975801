use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kiln configuration file (`kiln.json`, or TOML when the extension is `.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KilnConfig {
    /// Static template properties available to every recipe and command
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Directory holding the recipe tree (defaults to the config file's directory)
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    /// Print the full property set before every build
    #[serde(default)]
    pub verbose: bool,
    /// Image names never built automatically as dependants
    #[serde(default)]
    pub auto_build_excludes: Vec<String>,
    /// Where to dump the JSON report of processed images
    #[serde(default)]
    pub report_file_name: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandsConfig {
    /// Templated command used by `kiln build`
    #[serde(default)]
    pub default_build_command: String,
    /// Templated command used by `kiln push`
    #[serde(default)]
    pub default_push_command: String,
}

impl KilnConfig {
    /// Load the config file at `path`.
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else as JSON.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ConfigLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParseToml {
                path: path.to_path_buf(),
                source: e,
            })
        } else {
            serde_json::from_str(&content).map_err(|e| crate::Error::ConfigParseJson {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }

    /// Resolve the recipe root directory.
    ///
    /// Precedence: `override_dir`, then `rootDir` from the config (relative
    /// paths are taken against the config file's directory), then the config
    /// file's directory itself.
    pub fn resolve_root_dir(&self, config_path: &Path, override_dir: Option<&Path>) -> PathBuf {
        let config_dir = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if let Some(dir) = override_dir {
            tracing::info!(root = %dir.display(), "overriding config rootDir");
            return dir.to_path_buf();
        }

        match &self.root_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => config_dir.join(dir),
            None => {
                tracing::info!(
                    root = %config_dir.display(),
                    "rootDir not defined in config, using config parent dir"
                );
                config_dir
            }
        }
    }

    /// Whether `identity` is listed in `autoBuildExcludes`.
    pub fn is_auto_build_excluded(&self, identity: &str) -> bool {
        self.auto_build_excludes.iter().any(|e| e == identity)
    }
}
