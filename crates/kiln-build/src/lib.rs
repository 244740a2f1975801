//! Recipe templating, dependant build propagation, and family replication for kiln.
//!
//! # Build / push pass
//!
//! ```text
//! kiln build -d base/Dockerfile.template -s minor
//!   1. Resolve    ── identity → RecipeDescriptor (lineage graph)
//!   2. Version    ── latest release + scope → next version
//!   3. Stamp      ── IMAGE_NAME, IMAGE_VERSION, <ID>_VERSION, provenance
//!   4. Materialize ── Dockerfile.template → Dockerfile
//!   5. Execute    ── templated build/push command
//!   6. Record     ── BuildOutcome + post-build hook (git tag on push)
//!   7. Propagate  ── same steps for every dependant, depth-first
//! ```
//!
//! A failing dependant is recorded in the [`BuildReport`] and its own
//! dependants are skipped; its siblings are still processed.

pub mod hook;
pub mod orchestrator;
pub mod replicate;
pub mod report;
pub mod runner;
pub mod stamp;
pub mod template;

pub use hook::{NoopHook, PostBuildHook};
pub use orchestrator::{BuildError, BuildRequest, Orchestrator};
pub use replicate::{FamilyReplicator, RenameRules, ReplicateError, ReplicateOptions, ReplicationTask};
pub use report::{BuildOutcome, BuildReport, ReportError, error_chain};
pub use runner::{CommandRunner, RunnerError, ShellRunner};
pub use template::{TemplateEngine, TemplateError};
