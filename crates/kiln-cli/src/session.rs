//! Per-invocation context shared by every subcommand.

use anyhow::Context;
use kiln_core::properties::{BUILDER_EMAIL, BUILDER_HOST, BUILDER_NAME, UNABLE_TO_DETERMINE};
use kiln_core::{KilnConfig, LineageGraph, PropertySet, VersionCatalog};
use kiln_git::{GitClient, GitError};
use std::path::PathBuf;

use crate::GlobalArgs;

/// Everything resolved before a subcommand runs.
///
/// Initialization order: config → released versions → properties →
/// lineage → `0.0.0` for images never released.
pub struct Session {
    pub config: KilnConfig,
    pub root: PathBuf,
    pub catalog: VersionCatalog,
    pub props: PropertySet,
    pub graph: LineageGraph,
    pub git: GitClient,
}

impl Session {
    pub async fn init(global: &GlobalArgs) -> anyhow::Result<Self> {
        let Some(config_path) = global.config.as_deref() else {
            anyhow::bail!("no config file given, pass --config <path>");
        };
        let config = KilnConfig::load(config_path)?;
        let root = config.resolve_root_dir(config_path, global.root_dir.as_deref());
        let root = std::path::absolute(&root)
            .with_context(|| format!("failed to resolve root directory {}", root.display()))?;
        tracing::debug!(root = %root.display(), "resolved root directory");

        let git = GitClient::new(root.clone());
        let catalog = git.latest_versions().await?;

        let mut props: PropertySet = config.properties.clone().into_iter().collect();
        props.apply_catalog(&catalog);
        props.set(BUILDER_NAME, or_unknown(git.user_name().await, BUILDER_NAME));
        props.set(BUILDER_EMAIL, or_unknown(git.user_email().await, BUILDER_EMAIL));
        props.set(BUILDER_HOST, host_name().await);
        props.apply_overrides(&global.properties);

        let graph = LineageGraph::discover(&root, &catalog)?;
        props.fill_missing_versions(graph.identities());

        let label = format!("Dockerfiles hierarchy discovered in {}", root.display());
        print!("{}", graph.render_forest(&label));

        Ok(Self {
            config,
            root,
            catalog,
            props,
            graph,
            git,
        })
    }
}

fn or_unknown(value: Result<String, GitError>, property: &str) -> String {
    match value {
        Ok(value) if !value.is_empty() => value,
        Ok(_) => UNABLE_TO_DETERMINE.to_owned(),
        Err(e) => {
            tracing::warn!(property, error = %e, "unable to determine builder identity");
            UNABLE_TO_DETERMINE.to_owned()
        }
    }
}

async fn host_name() -> String {
    match tokio::process::Command::new("hostname").output().await {
        Ok(output) if output.status.success() => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_owned();
            if name.is_empty() {
                UNABLE_TO_DETERMINE.to_owned()
            } else {
                name
            }
        }
        Ok(output) => {
            tracing::warn!(status = %output.status, "hostname failed");
            UNABLE_TO_DETERMINE.to_owned()
        }
        Err(e) => {
            tracing::warn!(error = %e, "unable to run hostname");
            UNABLE_TO_DETERMINE.to_owned()
        }
    }
}
