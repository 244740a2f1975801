use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Configuration ──
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse JSON config at {path}")]
    ConfigParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse TOML config at {path}")]
    ConfigParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Recipe parsing ──
    #[error("failed to resolve recipe path {path}")]
    RecipePathResolve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("recipe path {0} has no containing directory to derive an image name from")]
    NoContainingDirectory(PathBuf),

    #[error("failed to read recipe {path}")]
    RecipeRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to extract dependency from {0}; check that the first line starts with `FROM `")]
    MissingDependencyMarker(PathBuf),

    #[error("recipe {0} is empty; expected a `FROM ` line")]
    EmptyRecipe(PathBuf),

    // ── Lineage discovery ──
    #[error("failed to walk recipe tree under {root}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error(
        "image name '{identity}' is declared twice: {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateIdentity {
        identity: String,
        first: PathBuf,
        second: PathBuf,
    },

    // ── Version catalog ──
    #[error("failed to serialize version catalog")]
    CatalogSerialize { source: serde_json::Error },

    #[error("failed to parse version catalog")]
    CatalogParse { source: serde_json::Error },

    #[error("failed to write {path}")]
    CatalogWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
