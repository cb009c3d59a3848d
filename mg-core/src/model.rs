//! The resolved model handed to emitters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use mg_target::Target;
use serde::Serialize;

use crate::configuration::Configuration;
use crate::error::ResolveError;
use crate::solution::ResolvedSolution;

/// Every Configuration of a generation pass and the solutions grouping them.
///
/// A [`ResolvedModel`] only exists once the whole pass succeeded, emitters never see a
/// partially resolved workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModel {
    /// Sorted by project name, then target.
    configurations: Vec<Configuration>,
    solutions: Vec<ResolvedSolution>,
}

impl ResolvedModel {
    /// Assembles the model, checking that no two Configurations write the same artifact.
    pub fn new(
        configs: BTreeMap<Target, BTreeMap<CompactString, Configuration>>,
        solutions: Vec<ResolvedSolution>,
    ) -> Result<Self, ResolveError> {
        let mut configurations: Vec<Configuration> = configs
            .into_values()
            .flat_map(BTreeMap::into_values)
            .collect();
        configurations.sort_by(|a, b| (a.project(), a.target()).cmp(&(b.project(), b.target())));

        check_collisions(&configurations)?;
        Ok(ResolvedModel {
            configurations,
            solutions,
        })
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn solutions(&self) -> &[ResolvedSolution] {
        &self.solutions
    }

    pub fn configuration(&self, project: &str, target: &Target) -> Option<&Configuration> {
        self.configurations
            .binary_search_by(|conf| (conf.project(), conf.target()).cmp(&(project, target)))
            .ok()
            .map(|idx| &self.configurations[idx])
    }

    pub fn solution(&self, name: &str) -> Option<&ResolvedSolution> {
        self.solutions.iter().find(|solution| solution.name == name)
    }

    /// The Configurations realised in `solution`, in solution order.
    pub fn configurations_of<'m>(&'m self, solution: &'m ResolvedSolution) -> Vec<&'m Configuration> {
        solution
            .configurations
            .iter()
            .flat_map(|sln| {
                sln.projects
                    .iter()
                    .filter_map(move |project| self.configuration(&project.name, &sln.target))
            })
            .collect()
    }
}

/// Artifacts of one Configuration that must be unique across the whole model.
fn artifacts(conf: &Configuration) -> impl Iterator<Item = &Path> + '_ {
    conf.binary_path()
        .into_iter()
        .chain(conf.intermediate_path())
        .chain(conf.build_steps().iter().map(|step| step.output.as_path()))
}

fn check_collisions(configurations: &[Configuration]) -> Result<(), ResolveError> {
    let mut seen: BTreeMap<&Path, &Configuration> = BTreeMap::new();
    for conf in configurations {
        for path in artifacts(conf) {
            if let Some(first) = seen.insert(path, conf) {
                return Err(ResolveError::OutputPathCollision {
                    path: PathBuf::from(path),
                    first: first.project().into(),
                    first_target: *first.target(),
                    second: conf.project().into(),
                    second_target: *conf.target(),
                });
            }
        }
    }
    Ok(())
}
