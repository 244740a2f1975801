use std::path::PathBuf;
use std::process::Stdio;

use crate::git::GitError;

/// Runs `git` for the release-tag workflow.
///
/// [`GitClient`](crate::GitClient) only needs two shapes of invocation:
/// captured output for reading remote tags and identity settings, and
/// terminal-attached runs for tagging and pushing, where git may prompt for
/// credentials. Tests mock this trait with mockall.
#[allow(async_fn_in_trait)]
pub trait GitExecutor: Send + Sync {
    /// Run git and return its stdout (`ls-remote --tags`, `config user.name`).
    async fn exec(&self, args: &[String]) -> Result<String, GitError>;

    /// Run git attached to the terminal (`tag`, `push --tags`).
    async fn exec_streaming(&self, args: &[String]) -> Result<(), GitError>;
}

/// Spawns the `git` binary inside the recipe root, so the repository that
/// holds the recipes is the one whose tags are read and written.
pub struct RealExecutor {
    work_dir: PathBuf,
}

impl RealExecutor {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    fn git(&self, args: &[String]) -> tokio::process::Command {
        tracing::debug!(dir = %self.work_dir.display(), ?args, "running git");
        let mut command = tokio::process::Command::new("git");
        command.args(args).current_dir(&self.work_dir);
        command
    }
}

impl GitExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, GitError> {
        // No stdin: a credential prompt must fail instead of hanging the capture.
        let output = self
            .git(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GitError::NotFound { source: e })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                args: args.to_vec(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|e| GitError::InvalidUtf8 { source: e })
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), GitError> {
        println!("Executing: git {}", args.join(" "));
        let status = self
            .git(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| GitError::NotFound { source: e })?;

        if !status.success() {
            return Err(GitError::CommandFailed {
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            });
        }
        Ok(())
    }
}
