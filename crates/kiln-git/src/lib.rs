//! Git-backed version source and release tagging for kiln.
//!
//! Released image versions live in git tags named `<image>@<version>`.

pub mod client;
pub mod executor;
pub mod git;

pub use client::{GitClient, ReleaseError, VersionSourceError, parse_remote_tags};
pub use executor::{GitExecutor, RealExecutor};
pub use git::GitError;
