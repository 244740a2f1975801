/// Failures talking to the git binary while reading or publishing release tags.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The binary could not be spawned at all.
    #[error("unable to run git, install it and make sure it is on PATH")]
    NotFound { source: std::io::Error },

    /// git ran and exited non-zero, e.g. an unreachable remote or an existing tag.
    #[error("git {} failed: {stderr}", args.join(" "))]
    CommandFailed { args: Vec<String>, stderr: String },

    #[error("git printed output that is not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },
}
