use std::collections::HashSet;

use kiln_core::recipe::RENDERED_FILE_NAME;
use kiln_core::{BumpScope, LineageSource, PropertySet, RecipeDescriptor};

use crate::hook::PostBuildHook;
use crate::report::{BuildOutcome, BuildReport};
use crate::runner::{CommandRunner, RunnerError, split_command};
use crate::stamp::stamp_build_properties;
use crate::template::{TemplateEngine, TemplateError};

/// One build or push pass, as requested on the command line.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Command template, rendered against the properties of each image
    pub command: String,
    /// Image the pass starts from
    pub identity: String,
    pub scope: BumpScope,
    /// Also process direct and transitive dependants
    pub propagate: bool,
}

/// Drives a build/push pass over the lineage.
///
/// The starting image is processed first; its failure is recorded, ends the
/// pass and is returned. Dependants follow in pre-order. A failing dependant is
/// recorded in the report and its own dependants are skipped, while its
/// siblings are still processed.
pub struct Orchestrator<'a, L, R> {
    lineage: &'a L,
    runner: &'a R,
    engine: &'a TemplateEngine,
    props: &'a mut PropertySet,
    excludes: Vec<String>,
    verbose: bool,
    report: BuildReport,
}

impl<'a, L: LineageSource, R: CommandRunner> Orchestrator<'a, L, R> {
    pub fn new(
        lineage: &'a L,
        runner: &'a R,
        engine: &'a TemplateEngine,
        props: &'a mut PropertySet,
    ) -> Self {
        Self {
            lineage,
            runner,
            engine,
            props,
            excludes: Vec::new(),
            verbose: false,
            report: BuildReport::new(),
        }
    }

    /// Dependants never triggered automatically.
    pub fn with_excludes<S: Into<String>>(mut self, excludes: impl IntoIterator<Item = S>) -> Self {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    /// Print the full property set before each image.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn into_report(self) -> BuildReport {
        self.report
    }

    pub async fn run<H: PostBuildHook>(
        &mut self,
        request: &BuildRequest,
        hook: &H,
    ) -> Result<(), BuildError> {
        println!(
            "Working with {} scope of: {}",
            request.scope, request.identity
        );
        tracing::info!(
            image = %request.identity,
            scope = %request.scope,
            propagate = request.propagate,
            "starting pass"
        );

        let mut visited = HashSet::from([request.identity.clone()]);
        if let Err(e) = self.process(&request.identity, request, hook).await {
            self.report.record_error(&request.identity, &e);
            return Err(e);
        }
        if !request.propagate {
            return Ok(());
        }

        let mut pending = self.pending_dependants(&request.identity, &mut visited);
        while let Some(identity) = pending.pop() {
            println!("Triggering dependant build of {identity}");
            match self.process(&identity, request, hook).await {
                Ok(()) => pending.extend(self.pending_dependants(&identity, &mut visited)),
                Err(e) => {
                    tracing::warn!(image = %identity, error = %e, "dependant failed, skipping its dependants");
                    self.report.record_error(&identity, &e);
                }
            }
        }

        tracing::info!(
            processed = self.report.outcomes().len(),
            errors = self.report.errors().len(),
            "pass complete"
        );
        Ok(())
    }

    // ── Single image ──

    async fn process<H: PostBuildHook>(
        &mut self,
        identity: &str,
        request: &BuildRequest,
        hook: &H,
    ) -> Result<(), BuildError> {
        let lineage: &'a L = self.lineage;
        let recipe = lineage
            .image(identity)
            .ok_or_else(|| BuildError::ImageNotFound {
                identity: identity.to_owned(),
            })?;

        let prior = recipe.latest_version_or_zero();
        let next = kiln_core::resolve(recipe.latest_version.as_ref(), request.scope);
        let recipe = recipe.clone().with_next_version(next.clone());
        tracing::info!(image = identity, %prior, %next, "resolved next version");

        stamp_build_properties(self.props, &recipe, &next, self.engine);
        if self.verbose {
            println!("Properties:\n{}", self.props.describe());
        }

        self.materialize(&recipe)?;

        let command = self
            .engine
            .render_str(&request.command, &*self.props)
            .map_err(|e| BuildError::Command {
                identity: identity.to_owned(),
                source: e,
            })?;
        println!("Executing: {command}");
        self.runner
            .run(&split_command(&command))
            .await
            .map_err(|e| BuildError::Run {
                identity: identity.to_owned(),
                source: e,
            })?;

        let outcome = BuildOutcome::new(&recipe, prior, next);
        self.report.record_outcome(outcome.clone());
        hook.on_post_build(&outcome)
            .await
            .map_err(|e| BuildError::Hook {
                identity: identity.to_owned(),
                source: Box::new(e),
            })
    }

    fn materialize(&self, recipe: &RecipeDescriptor) -> Result<(), BuildError> {
        let output = recipe.directory.join(RENDERED_FILE_NAME);
        tracing::debug!(
            template = %recipe.recipe_path.display(),
            output = %output.display(),
            "rendering recipe"
        );
        self.engine
            .render_file(&recipe.recipe_path, &output, &*self.props)
            .map_err(|e| BuildError::Template {
                identity: recipe.identity.clone(),
                source: e,
            })
    }

    // ── Propagation ──

    /// Dependants of `identity` still to visit, reversed so that popping
    /// yields them in discovery order.
    fn pending_dependants(&self, identity: &str, visited: &mut HashSet<String>) -> Vec<String> {
        let mut pending = Vec::new();
        for child in self.lineage.dependants(identity) {
            if child.identity == identity {
                continue;
            }
            if self.excludes.contains(&child.identity) {
                println!(
                    "Skipping dependant build of {} as it is listed in autoBuildExcludes",
                    child.identity
                );
                continue;
            }
            if !visited.insert(child.identity.clone()) {
                tracing::warn!(image = %child.identity, "lineage cycle detected, not visiting twice");
                continue;
            }
            pending.push(child.identity.clone());
        }
        pending.reverse();
        pending
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("image {identity} not found under the root directory")]
    ImageNotFound { identity: String },

    #[error("failed to render recipe of {identity}")]
    Template {
        identity: String,
        source: TemplateError,
    },

    #[error("failed to render command for {identity}")]
    Command {
        identity: String,
        source: TemplateError,
    },

    #[error("command for {identity} failed")]
    Run {
        identity: String,
        source: RunnerError,
    },

    #[error("post-build hook failed for {identity}")]
    Hook {
        identity: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
