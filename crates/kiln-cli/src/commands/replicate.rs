use kiln_build::{FamilyReplicator, RenameRules, ReplicateOptions};

use crate::session::Session;

pub fn copy_images_hierarchy(
    session: &Session,
    base_image: &str,
    recursive: bool,
    skip_existing_dirs: bool,
    replacements: &[String],
) -> anyhow::Result<()> {
    let rules = RenameRules::parse(replacements);
    if rules.is_empty() {
        tracing::warn!("no rename rules given, images will only be rewritten in place");
    }
    let options = ReplicateOptions {
        recursive,
        skip_existing: skip_existing_dirs,
    };

    let tasks =
        FamilyReplicator::new(&session.graph, &session.root, rules, options).replicate(base_image)?;
    println!("Replicated {} image(s) below {base_image}", tasks.len());
    Ok(())
}
