use kiln_core::LineageSource;
use regex::Regex;
use std::path::Path;

use crate::session::Session;

/// Write the released versions of discovered images to `file`.
///
/// Images whose directory (relative to the root) matches `exclude_dirs`
/// and released images no longer present under the root are left out.
pub fn dump_latest_versions(
    session: &Session,
    file: &Path,
    exclude_dirs: Option<&str>,
) -> anyhow::Result<()> {
    let exclude = exclude_dirs.map(Regex::new).transpose()?;

    let mut catalog = session.catalog.clone();
    catalog.retain(|identity, _| {
        let Some(recipe) = session.graph.image(identity) else {
            tracing::debug!(image = identity, "released image not found under root, skipping");
            return false;
        };
        let dir = recipe
            .directory
            .strip_prefix(&session.root)
            .unwrap_or(&recipe.directory);
        let excluded = exclude
            .as_ref()
            .is_some_and(|re| re.is_match(&dir.to_string_lossy()));
        if excluded {
            tracing::debug!(image = identity, dir = %dir.display(), "excluded by directory pattern");
        }
        !excluded
    });

    catalog.write_json(file)?;
    println!(
        "Latest versions of {} image(s) written to {}",
        catalog.len(),
        file.display()
    );
    Ok(())
}
