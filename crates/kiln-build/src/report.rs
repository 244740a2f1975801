use kiln_core::RecipeDescriptor;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

const SEPARATOR: &str =
    "====================================================================";

/// Result of one successfully processed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutcome {
    #[serde(rename = "name")]
    pub identity: String,
    #[serde(rename = "dockerfileDir")]
    pub directory: PathBuf,
    #[serde(rename = "currentVersion")]
    pub prior_version: Version,
    pub next_version: Version,
}

impl BuildOutcome {
    pub fn new(recipe: &RecipeDescriptor, prior_version: Version, next_version: Version) -> Self {
        Self {
            identity: recipe.identity.clone(),
            directory: recipe.directory.clone(),
            prior_version,
            next_version,
        }
    }
}

/// Outcomes and errors accumulated over one pass.
#[derive(Debug)]
pub struct BuildReport {
    outcomes: Vec<BuildOutcome>,
    errors: Vec<String>,
    started: Instant,
}

impl Default for BuildReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildReport {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            errors: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn record_outcome(&mut self, outcome: BuildOutcome) {
        self.outcomes.push(outcome);
    }

    /// Record a failure while processing `identity`, with its full cause chain.
    pub fn record_error(&mut self, identity: &str, error: &(dyn std::error::Error + 'static)) {
        let message = format!("error processing {identity}: {}", error_chain(error));
        tracing::debug!(%message, "recording error");
        self.errors.push(message);
    }

    pub fn outcomes(&self) -> &[BuildOutcome] {
        &self.outcomes
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// End-of-run summary.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{SEPARATOR}\nProcessed {} image(s) in {:.2?}:\n",
            self.outcomes.len(),
            self.started.elapsed()
        );
        for outcome in &self.outcomes {
            out.push_str(&format!(
                "\t{} {} => {}\n",
                outcome.identity, outcome.prior_version, outcome.next_version
            ));
        }
        if !self.errors.is_empty() {
            out.push_str(&format!(
                "Following ({}) errors occurred during image processing:\n",
                self.errors.len()
            ));
            for error in &self.errors {
                out.push_str(&format!("\t{error}\n"));
            }
        }
        out
    }

    /// Dump outcomes as a JSON array.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let mut json = serde_json::to_string_pretty(&self.outcomes)
            .map_err(|e| ReportError::Serialize { source: e })?;
        json.push('\n');
        std::fs::write(path, json).map_err(|e| ReportError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// `outer: cause: root cause`
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to serialize build report")]
    Serialize { source: serde_json::Error },

    #[error("failed to write build report to {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
