//! Resolving build Configurations for a matrix of targets.
//!
//! A generation pass goes roughly:
//!
//! 1. Load a [`Workspace`], compiling every template and pattern it declares.
//! 2. For each selected solution, resolve a [`Configuration`] per (project, target) pair by
//!    running the project's mutator chain.
//! 3. Hand custom build steps their sources, then propagate public settings along the
//!    dependency graph.
//! 4. Assemble the solutions and check no two Configurations write the same artifact.
//!
//! Everything is deterministic, the same workspace always produces the same
//! [`ResolvedModel`].

use std::borrow::Cow;

use mg_target::RootPaths;
use mg_template::FieldTable;

pub mod cfgs;
pub mod claim;
pub mod configuration;
pub mod defs;
pub mod emit;
pub mod engine;
pub mod error;
pub mod graph;
pub mod listing;
pub mod model;
pub mod mutator;
pub mod project;
pub mod resolver;
pub mod solution;
pub mod workspace;

pub use claim::{BuildStepClaimer, BuildStepRule, Discriminator};
pub use configuration::{Configuration, OutputKind, Visibility};
pub use engine::{Engine, EngineConfig};
pub use error::ResolveError;
pub use model::ResolvedModel;
pub use project::{Project, ProjectBuilder};
pub use solution::{ResolvedSolution, Solution, SolutionBuilder};
pub use workspace::Workspace;

/// Substitutes `[project.*]`, `[target.*]` and `[solution.*]` placeholders.
pub type Templates = mg_template::Substitutor<Project, Solution>;

/// The [`Templates`] for a workspace rooted at `roots`.
pub fn templates(roots: RootPaths) -> Templates {
    let project = FieldTable::<Project>::new()
        .field("Name", |p| Cow::Borrowed(p.name()))
        .field("Kind", |p| Cow::Borrowed(p.kind().name()))
        .field("Guid", |p| Cow::Borrowed(p.guid()));
    let solution = FieldTable::<Solution>::new().field("Name", |s| Cow::Borrowed(s.name()));
    Templates::new(roots, project, solution)
}
