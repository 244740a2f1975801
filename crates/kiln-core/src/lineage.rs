//! Lineage graph: which recipe is built on top of which.
//!
//! # Indexes
//!
//! ```text
//! images      identity             → RecipeDescriptor
//! dependants  parent short name    → [RecipeDescriptor]   (discovery order)
//! ```
//!
//! A parent referenced by some recipe but not itself discovered is an
//! *external* parent (e.g. `ubuntu` from Docker Hub). It still owns a
//! dependants entry and appears as a root of the display forest.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use walkdir::WalkDir;

use crate::recipe::{RECIPE_FILE_NAME, RecipeDescriptor, parse_recipe};
use crate::version::VersionCatalog;

/// Read access to discovered recipes and their dependants.
pub trait LineageSource {
    /// Recipe registered under `identity`, if any.
    fn image(&self, identity: &str) -> Option<&RecipeDescriptor>;

    /// Recipes whose parent is `identity`, in discovery order.
    fn dependants(&self, identity: &str) -> &[RecipeDescriptor];
}

/// Every recipe found under a root directory, indexed by name and by parent.
#[derive(Debug, Default)]
pub struct LineageGraph {
    images: HashMap<String, RecipeDescriptor>,
    dependants: HashMap<String, Vec<RecipeDescriptor>>,
    discovery_order: Vec<String>,
}

/// One node of the display forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestNode {
    pub identity: String,
    /// Text shown for the node (`name (latest: 1.2.0)` for released images)
    pub label: String,
    /// Parent referenced by recipes but not managed in the tree
    pub external: bool,
    pub children: Vec<ForestNode>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` and register every `Dockerfile.template` found.
    ///
    /// Latest versions are attached from `catalog`. Hidden directories are
    /// skipped; siblings are visited in file-name order.
    pub fn discover(root: &Path, catalog: &VersionCatalog) -> crate::Result<Self> {
        tracing::info!(root = %root.display(), "analyzing {RECIPE_FILE_NAME} files");
        let mut graph = Self::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| crate::Error::Walk {
                root: root.to_path_buf(),
                source: e,
            })?;
            if !entry.file_type().is_file() || entry.file_name() != RECIPE_FILE_NAME {
                continue;
            }

            let recipe = parse_recipe(entry.path())?;
            let latest = catalog.get(&recipe.identity).cloned();
            graph.add_image(recipe.with_latest_version(latest))?;
        }

        tracing::debug!(images = graph.images.len(), "lineage discovery complete");
        Ok(graph)
    }

    /// Register one recipe under its identity and its parent's dependants.
    ///
    /// Fails without mutating the graph when the identity is already taken.
    pub fn add_image(&mut self, recipe: RecipeDescriptor) -> crate::Result<()> {
        if let Some(existing) = self.images.get(&recipe.identity) {
            return Err(crate::Error::DuplicateIdentity {
                identity: recipe.identity.clone(),
                first: existing.recipe_path.clone(),
                second: recipe.recipe_path.clone(),
            });
        }
        tracing::debug!(
            identity = %recipe.identity,
            parent = %recipe.parent_reference_short,
            "registering recipe"
        );

        self.dependants
            .entry(recipe.parent_reference_short.clone())
            .or_default()
            .push(recipe.clone());
        self.discovery_order.push(recipe.identity.clone());
        self.images.insert(recipe.identity.clone(), recipe);
        Ok(())
    }

    pub fn images(&self) -> &HashMap<String, RecipeDescriptor> {
        &self.images
    }

    /// Parent short name → dependants, for every parent referenced.
    pub fn dependants_index(&self) -> &HashMap<String, Vec<RecipeDescriptor>> {
        &self.dependants
    }

    /// Identities in discovery order.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.discovery_order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Parents referenced by some recipe but not managed here, in order of first reference.
    ///
    /// A recipe that names its own identity as parent (`ubuntu` built
    /// `FROM ubuntu:24.04`) counts its parent as external.
    pub fn external_parents(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.ordered_images()
            .filter(|image| self.has_external_parent(image))
            .filter_map(|image| {
                let parent = image.parent_reference_short.clone();
                seen.insert(parent.clone()).then_some(parent)
            })
            .collect()
    }

    /// Build the display forest.
    ///
    /// Roots are recipes without a parent followed by one synthetic node
    /// per external parent.
    pub fn forest(&self) -> Vec<ForestNode> {
        let mut roots: Vec<ForestNode> = self
            .ordered_images()
            .filter(|image| !image.has_parent())
            .map(|image| self.image_node(image))
            .collect();

        for parent in self.external_parents() {
            let children = self
                .dependants(&parent)
                .iter()
                .filter(|child| self.has_external_parent(child))
                .map(|child| self.image_node(child))
                .collect();
            roots.push(ForestNode {
                identity: parent.clone(),
                label: parent,
                external: true,
                children,
            });
        }

        roots
    }

    /// Render the forest depth-first under `label`.
    pub fn render_forest(&self, label: &str) -> String {
        let mut out = format!("{label}\n");
        let roots = self.forest();
        render_children(&roots, "", &mut out);
        out
    }

    fn ordered_images(&self) -> impl Iterator<Item = &RecipeDescriptor> {
        self.discovery_order
            .iter()
            .filter_map(|identity| self.images.get(identity))
    }

    fn has_external_parent(&self, image: &RecipeDescriptor) -> bool {
        image.has_parent()
            && (image.parent_reference_short == image.identity
                || !self.images.contains_key(&image.parent_reference_short))
    }

    fn image_node(&self, image: &RecipeDescriptor) -> ForestNode {
        let label = match &image.latest_version {
            Some(version) => format!("{} (latest: {version})", image.identity),
            None => image.identity.clone(),
        };
        let children = self
            .dependants(&image.identity)
            .iter()
            .filter(|child| child.identity != image.identity)
            .map(|child| self.image_node(child))
            .collect();

        ForestNode {
            identity: image.identity.clone(),
            label,
            external: false,
            children,
        }
    }
}

impl LineageSource for LineageGraph {
    fn image(&self, identity: &str) -> Option<&RecipeDescriptor> {
        self.images.get(identity)
    }

    fn dependants(&self, identity: &str) -> &[RecipeDescriptor] {
        self.dependants
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn render_children(nodes: &[ForestNode], prefix: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&node.label);
        out.push('\n');
        render_children(&node.children, &format!("{prefix}{indent}"), out);
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
