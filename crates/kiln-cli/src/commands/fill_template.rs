use kiln_build::TemplateEngine;
use std::path::Path;

use crate::session::Session;

pub fn fill_template(session: &Session, input: &Path, output: &Path) -> anyhow::Result<()> {
    if session.config.verbose {
        println!("Properties:\n{}", session.props.describe());
    }
    TemplateEngine::new().fill_template(input, output, &session.props)?;
    Ok(())
}
