use crate::executor::{GitExecutor, RealExecutor};
use crate::git::GitError;
use kiln_core::{VersionCatalog, parse_version};
use semver::Version;
use std::path::PathBuf;

/// Separator between image name and version in release tags.
pub const TAG_SEPARATOR: char = '@';

/// Git operations client, parameterized over the executor for testability.
pub struct GitClient<E: GitExecutor = RealExecutor> {
    executor: E,
}

impl GitClient<RealExecutor> {
    /// Client running git inside `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor: RealExecutor::new(work_dir),
        }
    }
}

impl<E: GitExecutor> GitClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Version source ──

    /// Latest released version per image, read from the remote's tags.
    ///
    /// Remote tags are used rather than local ones so that versions
    /// released from other clones are not reused.
    pub async fn latest_versions(&self) -> Result<VersionCatalog, VersionSourceError> {
        let start = std::time::Instant::now();
        println!("Obtaining image latest versions from git remote tags");

        let output = self
            .executor
            .exec(&args(["ls-remote", "--tags", "origin"]))
            .await
            .map_err(|e| VersionSourceError::ListRemoteTags { source: e })?;

        let catalog = parse_remote_tags(&output);
        tracing::debug!(
            images = catalog.len(),
            elapsed = ?start.elapsed(),
            "checked remote tags"
        );
        Ok(catalog)
    }

    // ── Version sink ──

    /// Create the local release tag `<identity>@<version>`.
    pub async fn tag_version(&self, identity: &str, version: &Version) -> Result<(), ReleaseError> {
        let tag = release_tag(identity, version);
        self.executor
            .exec_streaming(&args(["tag", &tag]))
            .await
            .map_err(|e| ReleaseError::Tag { tag, source: e })
    }

    /// Push all local tags to the remote.
    pub async fn push_tags(&self) -> Result<(), ReleaseError> {
        self.executor
            .exec_streaming(&args(["push", "--tags"]))
            .await
            .map_err(|e| ReleaseError::PushTags { source: e })
    }

    // ── Builder identity ──

    pub async fn user_name(&self) -> Result<String, GitError> {
        self.config_value("user.name").await
    }

    pub async fn user_email(&self) -> Result<String, GitError> {
        self.config_value("user.email").await
    }

    async fn config_value(&self, key: &str) -> Result<String, GitError> {
        let output = self.executor.exec(&args(["config", key])).await?;
        match output.lines().next() {
            Some(line) if !line.trim().is_empty() => Ok(line.trim().to_owned()),
            _ => Err(GitError::CommandFailed {
                args: args(["config", key]),
                stderr: "no value set".to_owned(),
            }),
        }
    }
}

/// `<identity>@<version>`
pub fn release_tag(identity: &str, version: &Version) -> String {
    format!("{identity}{TAG_SEPARATOR}{version}")
}

/// Build a catalog from `git ls-remote --tags` output.
///
/// Lines whose tag is not `<image>@<version>`, or whose version does not
/// parse, are skipped with a warning. Peeled `^{}` refs are ignored.
pub fn parse_remote_tags(output: &str) -> VersionCatalog {
    let mut catalog = VersionCatalog::new();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let tag = line.rsplit('/').next().unwrap_or(line).trim();
        if tag.ends_with("^{}") {
            continue;
        }

        let Some((identity, raw_version)) = tag.split_once(TAG_SEPARATOR) else {
            tracing::warn!(tag, "skipping version extraction for tag");
            continue;
        };
        if identity.is_empty() || raw_version.contains(TAG_SEPARATOR) {
            tracing::warn!(tag, "skipping version extraction for tag");
            continue;
        }

        match parse_version(raw_version) {
            Some(version) => catalog.observe(identity, version),
            None => tracing::warn!(tag, version = raw_version, "unparseable version in tag"),
        }
    }

    catalog
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum VersionSourceError {
    #[error("failed to list remote tags (is `origin` reachable?)")]
    ListRemoteTags { source: GitError },
}

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("failed to create release tag {tag}")]
    Tag { tag: String, source: GitError },

    #[error("failed to push release tags")]
    PushTags { source: GitError },
}
