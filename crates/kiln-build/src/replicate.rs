//! Cloning a family of images under new names.
//!
//! Starting from one image, its dependants (optionally all descendants) are
//! copied to directories computed by applying [`RenameRules`] to their path
//! relative to the root, and each copied recipe is rewritten to build on
//! the renamed parent.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kiln_core::properties::{normalize_name, version_property_name};
use kiln_core::recipe::RECIPE_FILE_NAME;
use kiln_core::{LineageSource, RecipeDescriptor};
use walkdir::WalkDir;

/// Ordered literal `from → to` substitutions.
///
/// Every rule also gets a normalized variant (`family-one=family-two` adds
/// `FAMILY_ONE=FAMILY_TWO`) so version property names follow the rename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameRules {
    pairs: Vec<(String, String)>,
}

impl RenameRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, from: &str, to: &str) {
        self.pairs.push((from.to_owned(), to.to_owned()));
        let (normalized_from, normalized_to) = (normalize_name(from), normalize_name(to));
        if normalized_from != from || normalized_to != to {
            self.pairs.push((normalized_from, normalized_to));
        }
    }

    /// Parse `from=to` pairs; malformed pairs are skipped with a warning.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut rules = Self::new();
        for pair in raw {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((from, to)) if !from.is_empty() && !to.contains('=') => rules.add(from, to),
                _ => tracing::warn!(
                    replacement = pair,
                    "unable to parse replacement, expected FROM=TO"
                ),
            }
        }
        rules
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Apply every rule in order as a plain substring replacement.
    pub fn apply(&self, text: &str) -> String {
        self.pairs
            .iter()
            .fold(text.to_owned(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }
}

/// One image to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationTask {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub source_identity: String,
    pub target_identity: String,
    pub original_parent: String,
    pub renamed_parent: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicateOptions {
    /// Clone all descendants, not only direct dependants
    pub recursive: bool,
    /// Rewrite already existing target directories instead of failing
    pub skip_existing: bool,
}

pub struct FamilyReplicator<'a, L> {
    lineage: &'a L,
    root: PathBuf,
    rules: RenameRules,
    options: ReplicateOptions,
}

impl<'a, L: LineageSource> FamilyReplicator<'a, L> {
    pub fn new(lineage: &'a L, root: &Path, rules: RenameRules, options: ReplicateOptions) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            lineage,
            root,
            rules,
            options,
        }
    }

    /// Images to clone below `start`, parents before their dependants.
    ///
    /// `start` may be a managed image or an external parent that has dependants.
    pub fn plan(&self, start: &str) -> Result<Vec<ReplicationTask>, ReplicateError> {
        if self.lineage.image(start).is_none() && self.lineage.dependants(start).is_empty() {
            return Err(ReplicateError::ImageNotFound {
                identity: start.to_owned(),
            });
        }

        let mut tasks = Vec::new();
        let mut visited = HashSet::from([start.to_owned()]);
        let mut pending: Vec<&RecipeDescriptor> = self.children(start, &mut visited);

        while let Some(child) = pending.pop() {
            tasks.push(self.task_for(child));
            if self.options.recursive {
                pending.extend(self.children(&child.identity, &mut visited));
            }
        }
        Ok(tasks)
    }

    /// Clone the family below `start`.
    ///
    /// Stops at the first failing image; directories already created for
    /// earlier images are left in place.
    pub fn replicate(&self, start: &str) -> Result<Vec<ReplicationTask>, ReplicateError> {
        let tasks = self.plan(start)?;
        println!("Found images to recreate:");
        for task in &tasks {
            println!(
                "\t{} => {}",
                task.source_dir.display(),
                task.target_dir.display()
            );
        }

        for task in &tasks {
            self.materialize(task)?;
        }
        Ok(tasks)
    }

    // ── Planning ──

    /// Unvisited dependants of `identity`, reversed for popping in discovery order.
    fn children(&self, identity: &str, visited: &mut HashSet<String>) -> Vec<&'a RecipeDescriptor> {
        let lineage: &'a L = self.lineage;
        let mut children: Vec<&'a RecipeDescriptor> = lineage
            .dependants(identity)
            .iter()
            .filter(|child| visited.insert(child.identity.clone()))
            .collect();
        children.reverse();
        children
    }

    fn task_for(&self, child: &RecipeDescriptor) -> ReplicationTask {
        // Recipes outside the root keep their absolute path, which `join` preserves.
        let relative = child
            .directory
            .strip_prefix(&self.root)
            .unwrap_or(&child.directory);
        let target_dir = self.root.join(self.rules.apply(&relative.to_string_lossy()));
        let target_identity = target_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.rules.apply(&child.identity));

        ReplicationTask {
            source_dir: child.directory.clone(),
            target_dir,
            source_identity: child.identity.clone(),
            target_identity,
            original_parent: child.parent_reference_short.clone(),
            renamed_parent: self.rules.apply(&child.parent_reference_short),
        }
    }

    // ── Materialization ──

    fn materialize(&self, task: &ReplicationTask) -> Result<(), ReplicateError> {
        // An unchanged path is the source itself and counts as existing.
        let exists = task.target_dir.exists();
        if exists {
            if !self.options.skip_existing {
                return Err(ReplicateError::TargetExists {
                    path: task.target_dir.clone(),
                });
            }
            println!(
                "Directory {} exists, updating it in place",
                task.target_dir.display()
            );
        }

        let recipe_path = task.target_dir.join(RECIPE_FILE_NAME);
        let content = if exists {
            tracing::debug!(dir = %task.target_dir.display(), "rewriting recipe in place");
            self.rules.apply(&read_recipe(&recipe_path)?)
        } else {
            copy_dir_recursive(&task.source_dir, &task.target_dir)?;
            read_recipe(&recipe_path)?
        };

        let content = rewrite_parent(&content, &task.original_parent, &task.renamed_parent);
        std::fs::write(&recipe_path, content).map_err(|e| ReplicateError::RecipeWrite {
            path: recipe_path.clone(),
            source: e,
        })?;
        tracing::info!(
            source = %task.source_identity,
            target = %task.target_identity,
            parent = %task.renamed_parent,
            "replicated image"
        );
        Ok(())
    }
}

/// Point a recipe at a renamed parent: every occurrence of its name and
/// of its version property.
pub fn rewrite_parent(content: &str, original_parent: &str, renamed_parent: &str) -> String {
    if original_parent.is_empty() || original_parent == renamed_parent {
        return content.to_owned();
    }
    content.replace(original_parent, renamed_parent).replace(
        &version_property_name(original_parent),
        &version_property_name(renamed_parent),
    )
}

fn read_recipe(path: &Path) -> Result<String, ReplicateError> {
    std::fs::read_to_string(path).map_err(|e| ReplicateError::RecipeRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copy `from` to `to` recursively, keeping file permissions.
fn copy_dir_recursive(from: &Path, to: &Path) -> Result<(), ReplicateError> {
    tracing::debug!(from = %from.display(), to = %to.display(), "copying image directory");
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| ReplicateError::Walk {
            root: from.to_path_buf(),
            source: e,
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        let copy_error = |e: std::io::Error| ReplicateError::Copy {
            from: entry.path().to_path_buf(),
            to: target.clone(),
            source: e,
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(copy_error)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(copy_error)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(copy_error)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(link)?, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(link, target).map(drop)
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicateError {
    #[error("unable to find image {identity} in the analyzed structure (is the root directory correct?)")]
    ImageNotFound { identity: String },

    #[error("target directory {path} already exists")]
    TargetExists { path: PathBuf },

    #[error("failed to copy {from} to {to}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk {root}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to read recipe {path}")]
    RecipeRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write recipe {path}")]
    RecipeWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
