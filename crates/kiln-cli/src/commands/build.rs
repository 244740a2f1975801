use kiln_build::{
    BuildOutcome, BuildReport, BuildRequest, NoopHook, Orchestrator, PostBuildHook, ShellRunner,
    TemplateEngine,
};
use kiln_core::recipe::{RECIPE_FILE_NAME, identity_from_path};
use kiln_core::{BumpScope, KilnConfig, LineageGraph, PropertySet};
use kiln_git::{GitClient, ReleaseError};

use crate::PassArgs;
use crate::session::Session;

/// Exit status after an interrupted pass (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

pub async fn build(session: &mut Session, args: &PassArgs) -> anyhow::Result<()> {
    let request = request(args, session.config.commands.default_build_command.clone())?;
    let report = run_pass(
        &session.graph,
        &mut session.props,
        &session.config,
        &request,
        &NoopHook,
    )
    .await?;
    fail_on_errors(&report)
}

/// Like `build`, tagging every pushed image in git and pushing the tags
/// once the starting image went through.
pub async fn push(session: &mut Session, args: &PassArgs) -> anyhow::Result<()> {
    let request = request(args, session.config.commands.default_push_command.clone())?;
    let hook = TagReleaseHook { git: &session.git };

    let report = run_pass(
        &session.graph,
        &mut session.props,
        &session.config,
        &request,
        &hook,
    )
    .await?;
    session.git.push_tags().await?;
    fail_on_errors(&report)
}

fn request(args: &PassArgs, command: String) -> anyhow::Result<BuildRequest> {
    if command.trim().is_empty() {
        anyhow::bail!("no command configured for this pass, set commands in the config file");
    }
    let recipe = if args.dockerfile.is_dir() {
        args.dockerfile.join(RECIPE_FILE_NAME)
    } else {
        args.dockerfile.clone()
    };

    Ok(BuildRequest {
        command,
        identity: identity_from_path(&recipe)?,
        scope: BumpScope::from(args.scope.as_str()),
        propagate: !args.skip_dependants,
    })
}

// ── Pass ──

async fn run_pass<H: PostBuildHook>(
    graph: &LineageGraph,
    props: &mut PropertySet,
    config: &KilnConfig,
    request: &BuildRequest,
    hook: &H,
) -> anyhow::Result<BuildReport> {
    let engine = TemplateEngine::new();
    let runner = ShellRunner;
    let mut orchestrator = Orchestrator::new(graph, &runner, &engine, props)
        .with_excludes(config.auto_build_excludes.iter().cloned())
        .verbose(config.verbose);

    let finished = tokio::select! {
        result = orchestrator.run(request, hook) => Some(result),
        () = interrupted() => None,
    };

    let report = orchestrator.into_report();
    print!("{}", report.render());
    if let Some(path) = &config.report_file_name {
        report.write_json(path)?;
        println!("Build report written to {}", path.display());
    }

    match finished {
        Some(result) => result?,
        None => {
            eprintln!("Interrupted, exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }
    Ok(report)
}

fn fail_on_errors(report: &BuildReport) -> anyhow::Result<()> {
    if report.has_errors() {
        anyhow::bail!(
            "{} dependant image(s) failed, see the report above",
            report.errors().len()
        );
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn interrupted() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c() => tracing::info!("received Ctrl-C"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to listen for SIGTERM");
                ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// ── Release tagging ──

struct TagReleaseHook<'a> {
    git: &'a GitClient,
}

impl PostBuildHook for TagReleaseHook<'_> {
    type Error = ReleaseError;

    async fn on_post_build(&self, outcome: &BuildOutcome) -> Result<(), Self::Error> {
        self.git
            .tag_version(&outcome.identity, &outcome.next_version)
            .await
    }
}
