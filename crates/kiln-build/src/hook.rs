use crate::report::BuildOutcome;

/// Invoked after an image's command succeeded, before its dependants run.
///
/// `push` uses this to tag the released version in git.
#[allow(async_fn_in_trait)]
pub trait PostBuildHook {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn on_post_build(&self, outcome: &BuildOutcome) -> Result<(), Self::Error>;
}

/// Hook that does nothing (`build`).
pub struct NoopHook;

impl PostBuildHook for NoopHook {
    type Error = std::convert::Infallible;

    async fn on_post_build(&self, _outcome: &BuildOutcome) -> Result<(), Self::Error> {
        Ok(())
    }
}
