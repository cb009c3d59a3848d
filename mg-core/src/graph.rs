//! Project to project dependencies of a single target.

use std::collections::{BTreeMap, HashMap};

use compact_str::CompactString;
use mg_ore::iter::ExtendUnique;
use mg_target::Target;
use rayon::prelude::*;

use crate::configuration::{Configuration, Contribution, Visibility};
use crate::error::ResolveError;

/// The dependency relation between the Configurations of one [`Target`].
#[derive(Debug, Clone, Copy)]
pub struct DependencyGraph<'c> {
    target: Target,
    configs: &'c BTreeMap<CompactString, Configuration>,
}

impl<'c> DependencyGraph<'c> {
    pub fn new(target: Target, configs: &'c BTreeMap<CompactString, Configuration>) -> Self {
        DependencyGraph { target, configs }
    }

    /// Everything `project`'s dependencies contribute to it, deduplicated by value.
    pub fn resolve_dependencies(&self, project: &str) -> Result<Contribution, ResolveError> {
        let conf = self.get(project, project)?;
        let mut stack = vec![conf.project()];
        let mut inherited = Contribution::default();
        for dep in conf.dependencies() {
            let exported = self.exported(&dep.project, conf.project(), &mut stack)?;
            inherited.merge_unique(&exported);
        }
        Ok(inherited)
    }

    /// What `project` exports: its own public settings and those of its public dependencies.
    fn exported(
        &self,
        project: &'c str,
        referenced_by: &str,
        stack: &mut Vec<&'c str>,
    ) -> Result<Contribution, ResolveError> {
        if let Some(start) = stack.iter().position(|name| *name == project) {
            return Err(self.cycle(&stack[start..], project));
        }
        let conf = self.get(project, referenced_by)?;
        stack.push(conf.project());

        let mut exported = conf.public().clone();
        for dep in conf.dependencies() {
            if dep.visibility == Visibility::Public {
                let transitive = self.exported(&dep.project, conf.project(), stack)?;
                exported.merge_unique(&transitive);
            }
        }

        stack.pop();
        Ok(exported)
    }

    /// Every project reachable from `project`, in discovery order, excluding `project` itself.
    pub fn closure(&self, project: &str) -> Result<Vec<CompactString>, ResolveError> {
        let mut reached: Vec<CompactString> = Vec::new();
        let mut pending = vec![self.get(project, project)?];
        while let Some(conf) = pending.pop() {
            for dep in conf.dependencies() {
                if dep.project != project && reached.extend_unique([dep.project.clone()]) > 0 {
                    pending.push(self.get(&dep.project, conf.project())?);
                }
            }
        }
        Ok(reached)
    }

    /// Groups every project into levels, each only depending on projects of earlier levels.
    ///
    /// Projects within a level are sorted by name.
    pub fn levels(&self) -> Result<Vec<Vec<CompactString>>, ResolveError> {
        let configs = self.configs;
        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut stack = Vec::new();
        for name in configs.keys() {
            self.depth(name, name, &mut depth, &mut stack)?;
        }

        let mut levels: Vec<Vec<CompactString>> = Vec::new();
        for name in configs.keys() {
            let level = depth[name.as_str()];
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(name.clone());
        }
        Ok(levels)
    }

    fn depth(
        &self,
        project: &'c str,
        referenced_by: &str,
        depth: &mut HashMap<&'c str, usize>,
        stack: &mut Vec<&'c str>,
    ) -> Result<usize, ResolveError> {
        if let Some(known) = depth.get(project) {
            return Ok(*known);
        }
        if let Some(start) = stack.iter().position(|name| *name == project) {
            return Err(self.cycle(&stack[start..], project));
        }

        let conf = self.get(project, referenced_by)?;
        stack.push(conf.project());
        let mut level = 0;
        for dep in conf.dependencies() {
            level = level.max(self.depth(&dep.project, conf.project(), depth, stack)? + 1);
        }
        stack.pop();

        depth.insert(conf.project(), level);
        Ok(level)
    }

    fn get(&self, project: &str, referenced_by: &str) -> Result<&'c Configuration, ResolveError> {
        self.configs
            .get(project)
            .ok_or_else(|| ResolveError::UnresolvedDependency {
                project: referenced_by.into(),
                target: self.target,
                dependency: project.into(),
            })
    }

    fn cycle(&self, path: &[&str], back_to: &str) -> ResolveError {
        let mut cycle = path.join(" -> ");
        cycle.push_str(" -> ");
        cycle.push_str(back_to);
        ResolveError::CyclicDependency {
            target: self.target,
            cycle,
        }
    }
}

/// Merges dependency contributions into every Configuration of `target`.
///
/// Levels run one after the other, the Configurations within a level are handled in parallel.
pub fn propagate(
    target: Target,
    configs: &mut BTreeMap<CompactString, Configuration>,
) -> Result<(), ResolveError> {
    let levels = DependencyGraph::new(target, configs).levels()?;
    let mut exports: HashMap<CompactString, Contribution> = HashMap::new();

    for level in levels {
        let view: &BTreeMap<CompactString, Configuration> = configs;
        let merged: Vec<(CompactString, Contribution, Contribution)> = level
            .into_par_iter()
            .map(|name| {
                let conf = &view[&name];
                let mut inherited = Contribution::default();
                let mut exported = conf.public().clone();
                for dep in conf.dependencies() {
                    // Every dependency sits on an earlier level.
                    let Some(dep_export) = exports.get(&dep.project) else {
                        continue;
                    };
                    inherited.merge_unique(dep_export);
                    if dep.visibility == Visibility::Public {
                        exported.merge_unique(dep_export);
                    }
                }
                (name, inherited, exported)
            })
            .collect();

        for (name, inherited, exported) in merged {
            if let Some(conf) = configs.get_mut(&name) {
                conf.inherit(&inherited);
            }
            exports.insert(name, exported);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use mg_target::{Compiler, DevEnv, Optimization, Platform};

    use super::*;

    fn target() -> Target {
        Target::new(DevEnv::VS2019, Platform::WIN32, Compiler::MSBUILD, Optimization::DEBUG).unwrap()
    }

    fn configs(
        edges: &[(&str, &str, Visibility)],
        defines: &[(&str, &str)],
    ) -> BTreeMap<CompactString, Configuration> {
        let mut configs = BTreeMap::new();
        let mut conf_for = |name: &str| -> CompactString {
            let name = CompactString::from(name);
            configs
                .entry(name.clone())
                .or_insert_with(|| Configuration::new(name.clone(), target()));
            name
        };
        let mut names = Vec::new();
        for (from, to, _) in edges {
            names.push((conf_for(from), conf_for(to)));
        }
        for (name, _) in defines {
            conf_for(name);
        }
        for ((from, to), (_, _, visibility)) in names.into_iter().zip(edges) {
            configs.get_mut(&from).unwrap().add_dependency(to, *visibility);
        }
        for (name, define) in defines {
            configs.get_mut(*name).unwrap().add_public_define(*define);
        }
        configs
    }

    #[test]
    fn smoketest_cycle() {
        let configs = configs(
            &[("A", "B", Visibility::Public), ("B", "A", Visibility::Public)],
            &[],
        );
        let graph = DependencyGraph::new(target(), &configs);
        let err = graph.resolve_dependencies("A").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cyclic dependency for target vs2019|win32|MSBuild|Debug: A -> B -> A"
        );
        assert!(matches!(graph.levels(), Err(ResolveError::CyclicDependency { .. })));

        let mut configs = configs;
        assert!(propagate(target(), &mut configs).is_err());
    }

    #[test]
    fn smoketest_diamond() {
        let edges = [
            ("A", "B", Visibility::Public),
            ("A", "C", Visibility::Public),
            ("B", "D", Visibility::Public),
            ("C", "D", Visibility::Public),
        ];
        let mut configs = configs(&edges, &[("D", "D_API=1"), ("B", "B_API=1")]);

        let graph = DependencyGraph::new(target(), &configs);
        let inherited = graph.resolve_dependencies("A").unwrap();
        assert_eq!(inherited.defines, ["B_API=1", "D_API=1"]);
        assert_eq!(graph.closure("A").unwrap(), ["B", "C", "D"]);
        assert_eq!(
            graph.levels().unwrap(),
            vec![vec!["D"], vec!["B", "C"], vec!["A"]]
        );

        propagate(target(), &mut configs).unwrap();
        assert_eq!(configs["A"].defines(), ["B_API=1", "D_API=1"]);
        assert_eq!(configs["C"].defines(), ["D_API=1"]);
    }

    #[test]
    fn smoketest_private_stops_after_one_hop() {
        let edges = [
            ("App", "Lib", Visibility::Public),
            ("Lib", "Detail", Visibility::Private),
        ];
        let mut configs = configs(&edges, &[("Detail", "DETAIL=1"), ("Lib", "LIB=1")]);
        propagate(target(), &mut configs).unwrap();

        assert_eq!(configs["Lib"].defines(), ["LIB=1", "DETAIL=1"]);
        assert_eq!(configs["App"].defines(), ["LIB=1"]);
    }

    #[test]
    fn smoketest_unresolved_dependency() {
        let mut configs = configs(&[], &[("App", "APP=1")]);
        configs
            .get_mut("App")
            .unwrap()
            .add_public_dependency("Missing");
        let err = propagate(target(), &mut configs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "project 'App' (vs2019|win32|MSBuild|Debug) depends on 'Missing' which is not resolved for that target"
        );
    }
}
