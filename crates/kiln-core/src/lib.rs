//! Core types and lineage analysis for kiln.
//!
//! This crate defines the configuration schema ([`KilnConfig`]), the recipe
//! parser ([`parse_recipe`]), semantic version bumping ([`resolve`]) and the
//! lineage graph ([`LineageGraph`]) that links every `Dockerfile.template`
//! to the recipes built on top of it.

pub mod config;
pub mod error;
pub mod lineage;
pub mod properties;
pub mod recipe;
pub mod version;

pub use config::{CommandsConfig, KilnConfig};
pub use error::{Error, Result};
pub use lineage::{ForestNode, LineageGraph, LineageSource};
pub use properties::{PropertySet, version_property_name};
pub use recipe::{RecipeDescriptor, parse_recipe};
pub use version::{BumpScope, VersionCatalog, parse_version, resolve};
