//! Solutions: named groupings of projects over a subset of the target matrix.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use compact_str::CompactString;
use mg_target::{Target, TargetPattern};
use mg_template::{Bindings, Template};
use serde::Serialize;

use crate::configuration::Configuration;
use crate::error::ResolveError;
use crate::graph::DependencyGraph;
use crate::project::Project;
use crate::Templates;

/// A project explicitly listed in a [`Solution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionEntry {
    pub project: CompactString,
    pub folder: Option<CompactString>,
}

/// Raw templates for the per target records of a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionPaths {
    pub name: String,
    pub file_name: String,
    pub path: String,
}

impl Default for SolutionPaths {
    fn default() -> Self {
        SolutionPaths {
            name: "[target.Compiler]_[target.Optimization]".to_string(),
            file_name: "[target.DevEnv]_[solution.Name]".to_string(),
            path: "_projects".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Solution {
    name: CompactString,
    targets: TargetPattern,
    entries: Vec<SolutionEntry>,
    configuration_name: Template,
    file_name: Template,
    path: Template,
}

impl Solution {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filter over the workspace targets this solution is realised for.
    pub fn targets(&self) -> &TargetPattern {
        &self.targets
    }

    pub fn entries(&self) -> &[SolutionEntry] {
        &self.entries
    }

    /// Groups the resolved Configurations of every target this solution is realised for.
    ///
    /// `targets` is the ordered target list of the workspace and `configs` holds every resolved
    /// Configuration by target and project name. A listed project is realised for the targets it
    /// was resolved for, its transitive dependencies are added without a folder.
    pub fn assemble(
        &self,
        targets: &[Target],
        configs: &BTreeMap<Target, BTreeMap<CompactString, Configuration>>,
        templates: &Templates,
    ) -> Result<ResolvedSolution, ResolveError> {
        let mut configurations = Vec::new();
        for target in targets.iter().filter(|target| self.targets.matches(target)) {
            let Some(resolved) = configs.get(target) else {
                continue;
            };
            let graph = DependencyGraph::new(*target, resolved);

            let mut projects: Vec<SolutionProject> = Vec::new();
            for entry in &self.entries {
                let Some(conf) = resolved.get(&entry.project) else {
                    tracing::debug!(solution = %self.name, project = %entry.project, %target, "project not realised for target");
                    continue;
                };
                match projects.iter_mut().find(|p| p.name == entry.project) {
                    // Relocate an entry that a dependency already pulled in.
                    Some(existing) => {
                        existing.folder.clone_from(&entry.folder);
                        existing.explicit = true;
                    }
                    None => projects.push(SolutionProject::new(conf, entry.folder.clone(), true)),
                }

                for dependency in graph.closure(&entry.project)? {
                    if projects.iter().all(|p| p.name != dependency) {
                        projects.push(SolutionProject::new(&resolved[&dependency], None, false));
                    }
                }
            }

            if projects.is_empty() {
                continue;
            }

            let bindings = Bindings::new().target(target).solution(self);
            let render = |field: &str, template: &Template| {
                templates
                    .render(template, &bindings)
                    .map_err(|source| ResolveError::UnresolvedPlaceholder {
                        owner: self.name.clone(),
                        target: Some(*target),
                        field: field.into(),
                        source,
                    })
            };
            configurations.push(SolutionConfiguration {
                name: render("name", &self.configuration_name)?,
                file_name: render("file_name", &self.file_name)?,
                path: templates.roots().join(render("path", &self.path)?),
                target: *target,
                projects,
            });
        }

        if configurations.is_empty() {
            tracing::warn!(solution = %self.name, "solution is not realised for any target");
        }
        Ok(ResolvedSolution {
            name: self.name.clone(),
            configurations,
        })
    }
}

pub struct SolutionBuilder {
    name: CompactString,
    targets: TargetPattern,
    entries: Vec<SolutionEntry>,
    paths: SolutionPaths,
}

impl SolutionBuilder {
    pub fn new(name: impl Into<CompactString>) -> Self {
        SolutionBuilder {
            name: name.into(),
            targets: TargetPattern::any(),
            entries: Vec::new(),
            paths: SolutionPaths::default(),
        }
    }

    pub fn targets(mut self, targets: TargetPattern) -> Self {
        self.targets = targets;
        self
    }

    /// Lists `project`, optionally under `folder` (folders nest with `/`).
    pub fn project(mut self, project: impl Into<CompactString>, folder: Option<&str>) -> Self {
        self.entries.push(SolutionEntry {
            project: project.into(),
            folder: folder.map(CompactString::from),
        });
        self
    }

    pub fn paths(mut self, paths: SolutionPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Compiles our templates and checks every listed project exists in `projects`.
    pub fn build(
        self,
        templates: &Templates,
        projects: &BTreeMap<CompactString, Project>,
    ) -> Result<Solution, ResolveError> {
        for entry in &self.entries {
            if !projects.contains_key(&entry.project) {
                return Err(ResolveError::UnknownProject {
                    name: entry.project.clone(),
                    referenced_by: self.name.clone(),
                });
            }
        }

        let compile = |field: &str, raw: &str| {
            templates
                .compile(raw)
                .map_err(|source| ResolveError::UnresolvedPlaceholder {
                    owner: self.name.clone(),
                    target: None,
                    field: field.into(),
                    source,
                })
        };
        let configuration_name = compile("name", &self.paths.name)?;
        let file_name = compile("file_name", &self.paths.file_name)?;
        let path = compile("path", &self.paths.path)?;

        Ok(Solution {
            name: self.name,
            targets: self.targets,
            entries: self.entries,
            configuration_name,
            file_name,
            path,
        })
    }
}

/// A project as it appears in one solution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionProject {
    pub name: CompactString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<CompactString>,
    /// `false` when only pulled in as a dependency.
    pub explicit: bool,
    pub configuration: String,
    pub project_file: PathBuf,
}

impl SolutionProject {
    fn new(conf: &Configuration, folder: Option<CompactString>, explicit: bool) -> Self {
        SolutionProject {
            name: conf.project().into(),
            folder,
            explicit,
            configuration: conf.name().unwrap_or_default().to_string(),
            project_file: conf.project_file().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionConfiguration {
    pub name: String,
    pub file_name: String,
    pub path: PathBuf,
    pub target: Target,
    pub projects: Vec<SolutionProject>,
}

impl SolutionConfiguration {
    /// The folder layout of this configuration, rooted at `label`.
    pub fn folder_tree(&self, label: &str) -> FolderNode {
        let mut root = FolderNode::folder(label);
        for project in &self.projects {
            let mut node = &mut root;
            for folder in project.folder.iter().flat_map(|folder| folder.split('/')) {
                node = node.child_folder(folder);
            }
            node.children.push(FolderNode {
                label: project.name.to_string(),
                is_folder: false,
                children: Vec::new(),
            });
        }
        root
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSolution {
    pub name: CompactString,
    pub configurations: Vec<SolutionConfiguration>,
}

/// Node of a solution's folder tree, printable with [`ptree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    label: String,
    is_folder: bool,
    children: Vec<FolderNode>,
}

impl FolderNode {
    fn folder(label: &str) -> Self {
        FolderNode {
            label: label.to_string(),
            is_folder: true,
            children: Vec::new(),
        }
    }

    fn child_folder(&mut self, label: &str) -> &mut FolderNode {
        let idx = match self
            .children
            .iter()
            .position(|child| child.is_folder && child.label == label)
        {
            Some(idx) => idx,
            None => {
                self.children.push(FolderNode::folder(label));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn child_nodes(&self) -> &[FolderNode] {
        &self.children
    }
}

impl ptree::TreeItem for FolderNode {
    type Child = FolderNode;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        if self.is_folder {
            write!(f, "{}/", self.label)
        } else {
            write!(f, "{}", self.label)
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}

impl fmt::Display for FolderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        ptree::write_tree(self, &mut buf).map_err(|_| fmt::Error)?;
        write!(f, "{}", String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mg_target::{Compiler, DevEnv, Optimization, Platform, RootPaths};

    use super::*;
    use crate::configuration::OutputKind;
    use crate::mutator::{BaseLayer, BasePaths, MutatorChain};
    use crate::project::ProjectBuilder;
    use crate::resolver::Resolver;

    struct Fixture {
        templates: Templates,
        projects: BTreeMap<CompactString, Project>,
    }

    fn fixture() -> Fixture {
        let templates = crate::templates(RootPaths::new("/ws", "_generated"));
        let base = Arc::new(BaseLayer::compile(&templates, &BasePaths::default()).unwrap());
        let release_only = TargetPattern {
            optimization: Optimization::RELEASE,
            ..TargetPattern::any()
        };

        let mut projects = BTreeMap::new();
        for (name, kind, deps) in [
            ("DearImguiIndex16Lib", OutputKind::Library, &[][..]),
            ("NetImguiLib (Disabled)", OutputKind::Library, &[][..]),
            ("SampleDisabled", OutputKind::Executable, &["DearImguiIndex16Lib", "NetImguiLib (Disabled)"][..]),
        ] {
            let mut builder = ProjectBuilder::new(name, kind);
            for dep in deps {
                builder = builder.dependency(*dep, Default::default(), TargetPattern::any());
            }
            let project = builder
                .build(templates.roots(), MutatorChain::new(Arc::clone(&base)))
                .unwrap();
            projects.insert(CompactString::from(name), project);
        }
        let project = ProjectBuilder::new("SampleRelease", OutputKind::Executable)
            .targets(vec![release_only])
            .build(templates.roots(), MutatorChain::new(Arc::clone(&base)))
            .unwrap();
        projects.insert("SampleRelease".into(), project);

        Fixture { templates, projects }
    }

    fn resolve_all(fixture: &Fixture, targets: &[Target]) -> BTreeMap<Target, BTreeMap<CompactString, Configuration>> {
        let resolver = Resolver::new(&fixture.templates);
        let mut configs = BTreeMap::new();
        for target in targets {
            let per_target: &mut BTreeMap<CompactString, Configuration> = configs.entry(*target).or_default();
            for (name, project) in &fixture.projects {
                if project.supports(target) {
                    per_target.insert(name.clone(), resolver.resolve(project, target).unwrap());
                }
            }
        }
        configs
    }

    fn targets() -> Vec<Target> {
        TargetPattern {
            dev_env: DevEnv::VS2019,
            platform: Platform::WIN64,
            compiler: Compiler::MSBUILD,
            optimization: Optimization::DEBUG | Optimization::RELEASE,
        }
        .expand()
    }

    #[test]
    fn smoketest_release_only_solution() {
        let fixture = fixture();
        let targets = targets();
        let configs = resolve_all(&fixture, &targets);

        let solution = SolutionBuilder::new("netImgui_Sample")
            .targets(TargetPattern {
                optimization: Optimization::RELEASE,
                ..TargetPattern::any()
            })
            .project("SampleDisabled", Some("Samples"))
            .build(&fixture.templates, &fixture.projects)
            .unwrap();
        let resolved = solution.assemble(&targets, &configs, &fixture.templates).unwrap();

        assert_eq!(resolved.configurations.len(), 1);
        let conf = &resolved.configurations[0];
        assert_eq!(conf.target.optimization(), Optimization::RELEASE);
        assert_eq!(conf.name, "MSBuild_Release");
        assert_eq!(conf.file_name, "vs2019_netImgui_Sample");
        assert_eq!(conf.path, PathBuf::from("/ws/_projects"));
    }

    #[test]
    fn smoketest_dependencies_auto_included_and_relocated() {
        let fixture = fixture();
        let targets = targets();
        let configs = resolve_all(&fixture, &targets);

        let solution = SolutionBuilder::new("netImgui_Sample")
            .project("SampleDisabled", Some("Samples"))
            .project("SampleRelease", Some("Samples"))
            .project("NetImguiLib (Disabled)", Some("CompatibilityTest"))
            .build(&fixture.templates, &fixture.projects)
            .unwrap();
        let resolved = solution.assemble(&targets, &configs, &fixture.templates).unwrap();
        assert_eq!(resolved.configurations.len(), 2);

        let debug = &resolved.configurations[0];
        let summary: Vec<_> = debug
            .projects
            .iter()
            .map(|p| (p.name.as_str(), p.folder.as_deref(), p.explicit))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("SampleDisabled", Some("Samples"), true),
                ("DearImguiIndex16Lib", None, false),
                ("NetImguiLib (Disabled)", Some("CompatibilityTest"), true),
            ]
        );

        // Only realised for Release.
        let release = &resolved.configurations[1];
        assert!(release.projects.iter().any(|p| p.name == "SampleRelease"));

        let tree = debug.folder_tree("netImgui_Sample").to_string();
        assert!(tree.contains("Samples/"));
        assert!(tree.contains("CompatibilityTest/"));
        assert!(tree.contains("DearImguiIndex16Lib"));
    }

    #[test]
    fn smoketest_unknown_project() {
        let fixture = fixture();
        let err = SolutionBuilder::new("netImgui_Server")
            .project("NetImguiServer", None)
            .build(&fixture.templates, &fixture.projects)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "'netImgui_Server' references unknown project 'NetImguiServer'"
        );
    }
}
